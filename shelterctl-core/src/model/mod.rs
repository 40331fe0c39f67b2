//! Domain models with validation at construction
//!
//! Request input is validated when building `PetInput` / `ShelterInput`.
//! Invalid input returns ValidationError before any store is touched.

pub mod pet;
pub mod shelter;
pub mod validation;

pub use pet::{Pet, PetFilter, PetInput, MAX_AGE, MIN_AGE};
pub use shelter::{Shelter, ShelterFilter, ShelterInput, MAX_CAPACITY, MIN_CAPACITY};
pub use validation::ValidationError;
