/// Bulk import against in-memory stores.
use std::io::Write;

use shelterctl_core::dual::DualStore;
use shelterctl_core::model::{PetInput, ShelterInput};
use shelterctl_core::{import_csv, import_str, ImportError};
use tempfile::NamedTempFile;

const SAMPLE: &str = "AnimalName;AnimalType;Skin;Age\nBella;Dog;Brown;4\nMilo;Cat;White;2\nKiwi;Bird;Green;1\n";

#[tokio::test]
async fn test_import_replaces_pets_in_both_stores() {
    let (store, mem) = DualStore::in_memory();
    let old = store
        .create_pet(PetInput::new("Old", "Dog", "Black", 9, None).unwrap())
        .await
        .unwrap()
        .document;

    let summary = import_str(&store, SAMPLE).await.unwrap();
    assert_eq!(summary.imported, 3);

    assert!(mem.document.pets.peek(old.id).is_none());
    assert!(mem.relational.pets.peek(old.id).is_none());
    assert_eq!(mem.document.pets.len(), 3);
    assert_eq!(mem.relational.pets.len(), 3);

    let view = store.list_pets(&Default::default()).await.unwrap();
    for (doc, rel) in view.document.iter().zip(&view.relational) {
        assert_eq!(doc.id, rel.id);
        assert_eq!(doc.created_at, rel.created_at);
        assert_eq!(doc.name, rel.name);
        assert!(doc.shelter_id.is_none());
    }
}

#[tokio::test]
async fn test_import_empties_shelter_membership() {
    let (store, mem) = DualStore::in_memory();
    let shelter = store
        .create_shelter(ShelterInput::new("Happy Paws", "Vienna", 2).unwrap())
        .await
        .unwrap()
        .document;
    store
        .create_pet(PetInput::new("Rex", "Dog", "Brown", 3, Some(shelter.id)).unwrap())
        .await
        .unwrap();

    import_str(&store, SAMPLE).await.unwrap();

    for m in [&mem.document, &mem.relational] {
        assert_eq!(m.shelter(shelter.id).unwrap().occupancy(), 0);
    }
}

#[tokio::test]
async fn test_malformed_file_touches_nothing() {
    let (store, mem) = DualStore::in_memory();
    store
        .create_pet(PetInput::new("Keep", "Cat", "Gray", 5, None).unwrap())
        .await
        .unwrap();
    let before = mem.document.write_count() + mem.relational.write_count();

    let err = import_str(&store, "h\nBella;Dog;Brown;4\nMilo;Cat;White;old\n")
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Malformed { line: 3, .. }));

    assert_eq!(mem.document.write_count() + mem.relational.write_count(), before);
    assert_eq!(mem.document.pets.len(), 1);
}

#[tokio::test]
async fn test_import_from_file() {
    let (store, mem) = DualStore::in_memory();
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();

    let summary = import_csv(&store, file.path()).await.unwrap();
    assert_eq!(summary.imported, 3);
    assert_eq!(mem.relational.pets.len(), 3);
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let (store, _mem) = DualStore::in_memory();
    let err = import_csv(&store, std::path::Path::new("/nonexistent/pets.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Io { .. }));
}
