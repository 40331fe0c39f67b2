//! Pet records and their validated input

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::validation::{require_range, require_text, ValidationError};

/// Youngest accepted age
pub const MIN_AGE: i32 = 0;

/// Oldest accepted age
pub const MAX_AGE: i32 = 50;

/// A pet, as held by one store.
///
/// Both stores hold a copy with the same `id` and `created_at`; everything
/// else may drift if a dual write only half succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub species: String,
    pub skin: String,
    pub age: i32,
    pub shelter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Pet {
    /// Build a record from validated input and a coordinator-assigned identity.
    pub fn new(id: Uuid, created_at: DateTime<Utc>, input: PetInput) -> Self {
        Self {
            id,
            name: input.name,
            species: input.species,
            skin: input.skin,
            age: input.age,
            shelter_id: input.shelter_id,
            created_at,
        }
    }

    /// Overwrite the descriptive fields. The shelter reference is left alone;
    /// it only changes through assignment so membership stays mirrored.
    pub fn apply(&mut self, input: &PetInput) {
        self.name.clone_from(&input.name);
        self.species.clone_from(&input.species);
        self.skin.clone_from(&input.skin);
        self.age = input.age;
    }
}

/// Validated pet fields for create and update requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetInput {
    pub name: String,
    pub species: String,
    pub skin: String,
    pub age: i32,
    pub shelter_id: Option<Uuid>,
}

impl PetInput {
    /// Validate raw request fields.
    ///
    /// # Rules
    /// - name, species and skin are non-blank, at most 256 characters
    /// - age is within `0..=50`
    ///
    /// # Example
    /// ```
    /// use shelterctl_core::model::PetInput;
    ///
    /// assert!(PetInput::new("Rex", "Dog", "Brown", 3, None).is_ok());
    /// assert!(PetInput::new("Rex", "Dog", "Brown", 51, None).is_err());
    /// ```
    pub fn new(
        name: &str,
        species: &str,
        skin: &str,
        age: i32,
        shelter_id: Option<Uuid>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            name: require_text("name", name)?,
            species: require_text("species", species)?,
            skin: require_text("skin", skin)?,
            age: require_range("age", age, MIN_AGE, MAX_AGE)?,
            shelter_id,
        })
    }
}

/// Filter for pet lookups. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetFilter {
    pub species: Option<String>,
    pub shelter_id: Option<Uuid>,
}

impl PetFilter {
    pub fn species(species: impl Into<String>) -> Self {
        Self {
            species: Some(species.into()),
            ..Self::default()
        }
    }

    pub fn in_shelter(shelter_id: Uuid) -> Self {
        Self {
            shelter_id: Some(shelter_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_none() && self.shelter_id.is_none()
    }

    pub fn matches(&self, pet: &Pet) -> bool {
        self.species.as_ref().map_or(true, |s| &pet.species == s)
            && self.shelter_id.map_or(true, |id| pet.shelter_id == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rex() -> Pet {
        let input = PetInput::new("Rex", "Dog", "Brown", 3, None).unwrap();
        Pet::new(Uuid::new_v4(), Utc::now(), input)
    }

    #[test]
    fn rejects_age_out_of_bounds() {
        let err = PetInput::new("Rex", "Dog", "Brown", -1, None).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "age", .. }));

        let err = PetInput::new("Rex", "Dog", "Brown", 51, None).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "age", .. }));
    }

    #[test]
    fn rejects_empty_name() {
        let err = PetInput::new("", "Dog", "Brown", 3, None).unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "name" });
    }

    #[test]
    fn apply_keeps_identity_and_shelter() {
        let shelter = Uuid::new_v4();
        let mut pet = rex();
        pet.shelter_id = Some(shelter);
        let before = pet.clone();

        let changes = PetInput::new("Max", "Cat", "Gray", 7, None).unwrap();
        pet.apply(&changes);

        assert_eq!(pet.id, before.id);
        assert_eq!(pet.created_at, before.created_at);
        assert_eq!(pet.shelter_id, Some(shelter));
        assert_eq!(pet.name, "Max");
        assert_eq!(pet.age, 7);
    }

    #[test]
    fn filter_matching() {
        let pet = rex();
        assert!(PetFilter::default().matches(&pet));
        assert!(PetFilter::species("Dog").matches(&pet));
        assert!(!PetFilter::species("Cat").matches(&pet));
        assert!(!PetFilter::in_shelter(Uuid::new_v4()).matches(&pet));
    }
}
