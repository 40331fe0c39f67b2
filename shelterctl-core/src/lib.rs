pub mod bench;
pub mod config;
pub mod dual;
pub mod error;
pub mod import;
pub mod model;
pub mod store;

pub use config::{ConfigError, MongoSettings, ShelterConfig};
pub use dual::{DualStore, DualView, ShelterWithPets};
pub use error::{CoordinatorError, StoreError, StoreResult};
pub use import::{import_csv, import_str, ImportError, ImportSummary};
pub use model::{Pet, PetFilter, PetInput, Shelter, ShelterFilter, ShelterInput, ValidationError};
pub use store::{Repository, StoreHandle, StoreKind};
