//! Bulk pet import from semicolon-delimited files
//!
//! Format: one header line, then `name;species;skin;age` per row. Rows are
//! taken as-is apart from parsing the age; the whole file is parsed before
//! either store is touched, so a bad row aborts with nothing written.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use crate::dual::{creation_timestamp, DualStore};
use crate::error::CoordinatorError;
use crate::model::Pet;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed row at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

/// One parsed row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPet {
    pub name: String,
    pub species: String,
    pub skin: String,
    pub age: i32,
}

impl CsvPet {
    fn into_pet(self, created_at: chrono::DateTime<chrono::Utc>) -> Pet {
        Pet {
            id: Uuid::new_v4(),
            name: self.name,
            species: self.species,
            skin: self.skin,
            age: self.age,
            shelter_id: None,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
}

/// Parse the whole input. Line numbers in errors are 1-based and count the
/// header.
pub fn parse_csv(input: &str) -> Result<Vec<CsvPet>, ImportError> {
    let mut rows = Vec::new();

    for (index, line) in input.lines().enumerate().skip(1) {
        let line_no = index + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() < 4 {
            return Err(ImportError::Malformed {
                line: line_no,
                reason: format!("expected 4 fields, found {}", fields.len()),
            });
        }

        let age = fields[3].trim().parse::<i32>().map_err(|e| ImportError::Malformed {
            line: line_no,
            reason: format!("age {:?}: {}", fields[3], e),
        })?;

        rows.push(CsvPet {
            name: fields[0].to_string(),
            species: fields[1].to_string(),
            skin: fields[2].to_string(),
            age,
        });
    }

    Ok(rows)
}

/// Replace every pet in both stores with the rows of `input`.
pub async fn import_str(store: &DualStore, input: &str) -> Result<ImportSummary, ImportError> {
    let rows = parse_csv(input)?;
    let pets: Vec<Pet> = rows
        .into_iter()
        .map(|row| row.into_pet(creation_timestamp()))
        .collect();
    let imported = pets.len();

    store.replace_pets(pets).await?;
    Ok(ImportSummary { imported })
}

/// Read `path` and import it.
pub async fn import_csv(store: &DualStore, path: &Path) -> Result<ImportSummary, ImportError> {
    let input = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!(?path, "importing pets");
    let summary = import_str(store, &input).await?;
    tracing::info!(imported = summary.imported, "import complete");
    Ok(summary)
}
