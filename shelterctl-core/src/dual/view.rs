//! Dual-keyed values: one slot per store
//!
//! Serializes as `{"MongoDB": ..., "PostgreSQL": ...}` so callers can see
//! which store produced which value, divergence included.

use serde::Serialize;
use uuid::Uuid;

use crate::error::CoordinatorError;
use crate::store::{Record, StoreKind};

/// A pair of values, one per store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DualView<T> {
    #[serde(rename = "MongoDB")]
    pub document: T,
    #[serde(rename = "PostgreSQL")]
    pub relational: T,
}

impl<T> DualView<T> {
    pub fn new(document: T, relational: T) -> Self {
        Self {
            document,
            relational,
        }
    }

    /// Same value in both slots.
    pub fn splat(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(value.clone(), value)
    }

    pub fn get(&self, kind: StoreKind) -> &T {
        match kind {
            StoreKind::Document => &self.document,
            StoreKind::Relational => &self.relational,
        }
    }

    pub fn get_mut(&mut self, kind: StoreKind) -> &mut T {
        match kind {
            StoreKind::Document => &mut self.document,
            StoreKind::Relational => &mut self.relational,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> DualView<U> {
        DualView::new(f(self.document), f(self.relational))
    }

    pub fn as_ref(&self) -> DualView<&T> {
        DualView::new(&self.document, &self.relational)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StoreKind, &T)> {
        [
            (StoreKind::Document, &self.document),
            (StoreKind::Relational, &self.relational),
        ]
        .into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (StoreKind, &mut T)> {
        [
            (StoreKind::Document, &mut self.document),
            (StoreKind::Relational, &mut self.relational),
        ]
        .into_iter()
    }
}

/// Lookups: the copies of one logical record.
///
/// This is where "not found" is decided for every operation: a logical record
/// exists iff at least one store holds a copy, and mutations touch every copy
/// that exists.
impl<T: Record> DualView<Option<T>> {
    pub fn exists(&self) -> bool {
        self.document.is_some() || self.relational.is_some()
    }

    /// Present in exactly one store
    pub fn is_torn(&self) -> bool {
        self.document.is_some() != self.relational.is_some()
    }

    /// Fail with NotFound if no store holds a copy.
    pub fn require(self, id: Uuid) -> Result<Self, CoordinatorError> {
        if self.exists() {
            if self.is_torn() {
                tracing::warn!(
                    resource = T::RESOURCE,
                    %id,
                    missing_from = %self.missing().map(|k| k.label()).unwrap_or_default(),
                    "torn record: present in one store only"
                );
            }
            Ok(self)
        } else {
            Err(CoordinatorError::not_found(T::RESOURCE, id))
        }
    }

    /// Store lacking a copy, if exactly one does
    pub fn missing(&self) -> Option<StoreKind> {
        match (&self.document, &self.relational) {
            (Some(_), None) => Some(StoreKind::Relational),
            (None, Some(_)) => Some(StoreKind::Document),
            _ => None,
        }
    }

    /// Existing copies, document store first
    pub fn copies(&self) -> impl Iterator<Item = (StoreKind, &T)> {
        self.iter().filter_map(|(kind, v)| v.as_ref().map(|v| (kind, v)))
    }

    pub fn copies_mut(&mut self) -> impl Iterator<Item = (StoreKind, &mut T)> {
        self.iter_mut()
            .filter_map(|(kind, v)| v.as_mut().map(|v| (kind, v)))
    }

    /// First existing copy, document store preferred
    pub fn primary(&self) -> Option<&T> {
        self.document.as_ref().or(self.relational.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Pet, PetInput};
    use chrono::Utc;

    fn pet() -> Pet {
        let input = PetInput::new("Rex", "Dog", "Brown", 3, None).unwrap();
        Pet::new(Uuid::new_v4(), Utc::now(), input)
    }

    #[test]
    fn serializes_with_store_labels() {
        let view = DualView::new(1, 2);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json[StoreKind::Document.label()], 1);
        assert_eq!(json[StoreKind::Relational.label()], 2);
    }

    #[test]
    fn absent_from_both_is_not_found() {
        let view: DualView<Option<Pet>> = DualView::default();
        let err = view.require(Uuid::nil()).unwrap_err();
        assert!(matches!(err, CoordinatorError::NotFound { resource: "pet", .. }));
    }

    #[test]
    fn torn_record_still_exists() {
        let p = pet();
        let view = DualView::new(None, Some(p.clone()));
        assert!(view.is_torn());
        assert_eq!(view.missing(), Some(StoreKind::Document));

        let view = view.require(p.id).unwrap();
        assert_eq!(view.primary(), Some(&p));
        let kinds: Vec<_> = view.copies().map(|(k, _)| k).collect();
        assert_eq!(kinds, [StoreKind::Relational]);
    }

    #[test]
    fn map_keeps_slots() {
        let view = DualView::new("a", "bb").map(str::len);
        assert_eq!(view, DualView::new(1, 2));
    }
}
