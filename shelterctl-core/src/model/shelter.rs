//! Shelter records and their validated input

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::validation::{require_range, require_text, ValidationError};

/// Smallest accepted capacity
pub const MIN_CAPACITY: i32 = 0;

/// Largest accepted capacity
pub const MAX_CAPACITY: i32 = 10_000;

/// A shelter, as held by one store.
///
/// `pet_ids` is the membership list. It is maintained by the coordinator and
/// is never the source of truth on its own: the relational store derives it
/// from `pets.shelter_id`, the document store embeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shelter {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
    pub pet_ids: Vec<Uuid>,
}

impl Shelter {
    /// Build an empty shelter from validated input.
    pub fn new(id: Uuid, created_at: DateTime<Utc>, input: ShelterInput) -> Self {
        Self {
            id,
            name: input.name,
            location: input.location,
            capacity: input.capacity,
            created_at,
            pet_ids: Vec::new(),
        }
    }

    pub fn apply(&mut self, input: &ShelterInput) {
        self.name.clone_from(&input.name);
        self.location.clone_from(&input.location);
        self.capacity = input.capacity;
    }

    pub fn occupancy(&self) -> usize {
        self.pet_ids.len()
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() >= usize::try_from(self.capacity).unwrap_or(0)
    }

    pub fn has_member(&self, pet_id: Uuid) -> bool {
        self.pet_ids.contains(&pet_id)
    }

    /// Add a member; returns false if it was already there.
    pub fn add_member(&mut self, pet_id: Uuid) -> bool {
        if self.has_member(pet_id) {
            return false;
        }
        self.pet_ids.push(pet_id);
        true
    }

    /// Remove a member; returns false if it wasn't there.
    pub fn remove_member(&mut self, pet_id: Uuid) -> bool {
        let before = self.pet_ids.len();
        self.pet_ids.retain(|id| *id != pet_id);
        self.pet_ids.len() != before
    }
}

/// Validated shelter fields for create and update requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelterInput {
    pub name: String,
    pub location: String,
    pub capacity: i32,
}

impl ShelterInput {
    /// Validate raw request fields (capacity within `0..=10000`).
    pub fn new(name: &str, location: &str, capacity: i32) -> Result<Self, ValidationError> {
        Ok(Self {
            name: require_text("name", name)?,
            location: require_text("location", location)?,
            capacity: require_range("capacity", capacity, MIN_CAPACITY, MAX_CAPACITY)?,
        })
    }
}

/// Filter for shelter lookups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShelterFilter {
    pub location: Option<String>,
}

impl ShelterFilter {
    pub fn location(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_none()
    }

    pub fn matches(&self, shelter: &Shelter) -> bool {
        self.location
            .as_ref()
            .map_or(true, |l| &shelter.location == l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shelter(capacity: i32) -> Shelter {
        let input = ShelterInput::new("Paws", "Vienna", capacity).unwrap();
        Shelter::new(Uuid::new_v4(), Utc::now(), input)
    }

    #[test]
    fn capacity_bounds() {
        assert!(ShelterInput::new("Paws", "Vienna", 0).is_ok());
        assert!(ShelterInput::new("Paws", "Vienna", 10_000).is_ok());

        let err = ShelterInput::new("Paws", "Vienna", 10_001).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "capacity", .. }));
        assert!(ShelterInput::new("Paws", "Vienna", -5).is_err());
    }

    #[test]
    fn zero_capacity_is_always_full() {
        assert!(shelter(0).is_full());
    }

    #[test]
    fn membership_is_a_set() {
        let mut s = shelter(2);
        let pet = Uuid::new_v4();

        assert!(s.add_member(pet));
        assert!(!s.add_member(pet));
        assert_eq!(s.occupancy(), 1);
        assert!(!s.is_full());

        assert!(s.add_member(Uuid::new_v4()));
        assert!(s.is_full());

        assert!(s.remove_member(pet));
        assert!(!s.remove_member(pet));
        assert!(!s.has_member(pet));
    }

    #[test]
    fn location_filter() {
        let s = shelter(1);
        assert!(ShelterFilter::default().matches(&s));
        assert!(ShelterFilter::location("Vienna").matches(&s));
        assert!(!ShelterFilter::location("Graz").matches(&s));
    }
}
