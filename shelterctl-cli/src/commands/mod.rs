//! Command implementations for shelterctl CLI

pub mod bench;
pub mod config;
pub mod import;
pub mod serve;

pub use bench::run_bench;
pub use config::run_config;
pub use import::run_import;
pub use serve::run_serve;
