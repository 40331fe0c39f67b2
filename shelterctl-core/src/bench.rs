//! Store timing benchmark
//!
//! Runs the same pet workload against each store on its own, outside the
//! coordinator, and reports wall-clock time per step. The workload ends by
//! deleting every pet and emptying every shelter, so it must only be pointed
//! at scratch databases.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{SubsecRound, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::dual::DualView;
use crate::error::StoreResult;
use crate::model::{Pet, PetFilter, Shelter};
use crate::store::{StoreHandle, StoreKind};

const SPECIES: [&str; 4] = ["Dog", "Cat", "Bird", "Fish"];
const SKINS: [&str; 4] = ["Black", "White", "Brown", "Gray"];
const FIRST_NAMES: [&str; 8] = ["Ada", "Bruno", "Cleo", "Dexter", "Elsa", "Finn", "Greta", "Hugo"];
const LAST_NAMES: [&str; 6] = ["Miller", "Novak", "Okafor", "Petrov", "Quinn", "Rossi"];

/// Steps in execution order
pub const STEPS: [&str; 8] = [
    "create",
    "read all",
    "filter + aggregate",
    "filter",
    "filter + projection",
    "filter + sort",
    "update all",
    "delete all",
];

#[derive(Debug, Clone, PartialEq)]
pub struct BenchRow {
    pub step: &'static str,
    pub timings: DualView<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub scale: usize,
    pub rows: Vec<BenchRow>,
    /// Average age of dogs, per store, from the aggregation step
    pub dog_average_age: DualView<Option<f64>>,
}

/// Generate `scale` random, unassigned pets.
pub fn generate_pets(scale: usize, rng: &mut impl Rng) -> Vec<Pet> {
    let created_at = Utc::now().trunc_subsecs(3);
    (0..scale)
        .map(|_| Pet {
            id: Uuid::new_v4(),
            name: format!(
                "{} {}",
                FIRST_NAMES.choose(rng).unwrap_or(&"Pet"),
                LAST_NAMES.choose(rng).unwrap_or(&"Doe")
            ),
            species: SPECIES.choose(rng).unwrap_or(&"Dog").to_string(),
            skin: SKINS.choose(rng).unwrap_or(&"Brown").to_string(),
            age: rng.gen_range(1..=20),
            shelter_id: None,
            created_at,
        })
        .collect()
}

/// Run the workload against each store in turn.
pub async fn run(
    stores: &DualView<StoreHandle>,
    scale: usize,
    seed: Option<u64>,
) -> StoreResult<BenchReport> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut timings: DualView<Vec<Duration>> = DualView::default();
    let mut dog_average_age = DualView::default();

    for (kind, handle) in stores.iter() {
        let pets = generate_pets(scale, &mut rng);
        let (times, average) = run_store(kind, handle, pets).await?;
        *timings.get_mut(kind) = times;
        *dog_average_age.get_mut(kind) = average;
    }

    let rows = STEPS
        .iter()
        .enumerate()
        .map(|(i, &step)| BenchRow {
            step,
            timings: timings.as_ref().map(|t| t.get(i).copied().unwrap_or_default()),
        })
        .collect();

    Ok(BenchReport {
        scale,
        rows,
        dog_average_age,
    })
}

async fn run_store(
    kind: StoreKind,
    handle: &StoreHandle,
    pets: Vec<Pet>,
) -> StoreResult<(Vec<Duration>, Option<f64>)> {
    let repo = handle.pets();
    let dogs = PetFilter::species("Dog");
    let mut times = Vec::with_capacity(STEPS.len());

    tracing::info!(store = %kind, count = pets.len(), "bench: starting");

    let start = Instant::now();
    repo.create_many(&pets).await?;
    times.push(start.elapsed());

    let start = Instant::now();
    let all = repo.get_all().await?;
    times.push(start.elapsed());

    let start = Instant::now();
    let found = repo.find(&dogs).await?;
    let average = average_age(&found);
    times.push(start.elapsed());

    let start = Instant::now();
    let _ = repo.find(&dogs).await?;
    times.push(start.elapsed());

    let start = Instant::now();
    let names: Vec<String> = repo.find(&dogs).await?.into_iter().map(|p| p.name).collect();
    times.push(start.elapsed());

    let start = Instant::now();
    let mut ages: Vec<i32> = repo.find(&dogs).await?.iter().map(|p| p.age).collect();
    ages.sort_unstable_by(|a, b| b.cmp(a));
    times.push(start.elapsed());

    let start = Instant::now();
    let updated: Vec<Pet> = all
        .into_iter()
        .map(|mut p| {
            p.name = "Updated Name".to_string();
            p.species = "Updated Species".to_string();
            p.skin = "Updated Skin".to_string();
            p.age = 10;
            p
        })
        .collect();
    repo.update_many(&updated).await?;
    times.push(start.elapsed());

    let start = Instant::now();
    repo.delete_all().await?;
    times.push(start.elapsed());

    let emptied = empty_shelters(handle).await?;

    tracing::debug!(store = %kind, shelters = emptied, "bench: shelter members cleared");
    tracing::debug!(store = %kind, dogs = names.len(), oldest = ?ages.first(), "bench: done");
    Ok((times, average))
}

/// Drop every membership entry left pointing at the deleted pets.
async fn empty_shelters(handle: &StoreHandle) -> StoreResult<u64> {
    let listed: Vec<Shelter> = handle
        .shelters()
        .get_all()
        .await?
        .into_iter()
        .filter(|s| !s.pet_ids.is_empty())
        .map(|mut s| {
            s.pet_ids.clear();
            s
        })
        .collect();
    handle.shelters().update_many(&listed).await
}

fn average_age(pets: &[Pet]) -> Option<f64> {
    if pets.is_empty() {
        return None;
    }
    let total: i64 = pets.iter().map(|p| i64::from(p.age)).sum();
    Some(total as f64 / pets.len() as f64)
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} entities", self.scale)?;
        writeln!(
            f,
            "{:<22} {:>12} {:>12}",
            "step",
            StoreKind::Document.label(),
            StoreKind::Relational.label()
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<22} {:>9} ms {:>9} ms",
                row.step,
                row.timings.document.as_millis(),
                row.timings.relational.as_millis()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dual::DualStore;
    use crate::model::{PetInput, ShelterInput};
    use crate::store::MemoryStore;

    #[test]
    fn generated_pets_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let pets = generate_pets(200, &mut rng);
        assert_eq!(pets.len(), 200);
        assert!(pets.iter().all(|p| (1..=20).contains(&p.age)));
        assert!(pets.iter().all(|p| SPECIES.contains(&p.species.as_str())));
        assert!(pets.iter().all(|p| p.shelter_id.is_none()));
    }

    #[test]
    fn average_of_nothing_is_none() {
        assert_eq!(average_age(&[]), None);
    }

    #[tokio::test]
    async fn runs_every_step_and_cleans_up() {
        let doc = MemoryStore::new(StoreKind::Document);
        let rel = MemoryStore::new(StoreKind::Relational);
        let stores = DualView::new(doc.handle(), rel.handle());

        let report = run(&stores, 50, Some(42)).await.unwrap();

        let steps: Vec<_> = report.rows.iter().map(|r| r.step).collect();
        assert_eq!(steps, STEPS);
        assert!(doc.pets.is_empty());
        assert!(rel.pets.is_empty());

        let table = report.to_string();
        assert!(table.contains("MongoDB"));
        assert!(table.contains("delete all"));
    }

    #[tokio::test]
    async fn leaves_no_shelter_listing_deleted_pets() {
        let (store, mem) = DualStore::in_memory();
        let shelter = store
            .create_shelter(ShelterInput::new("Happy Paws", "Vienna", 3).unwrap())
            .await
            .unwrap()
            .document;
        store
            .create_pet(PetInput::new("Rex", "Dog", "Brown", 3, Some(shelter.id)).unwrap())
            .await
            .unwrap();

        run(store.stores(), 10, Some(1)).await.unwrap();

        for m in [&mem.document, &mem.relational] {
            assert!(m.pets.is_empty());
            assert_eq!(m.shelter(shelter.id).unwrap().occupancy(), 0);
        }
        let view = store.get_shelter(shelter.id).await.unwrap();
        assert!(view.document.unwrap().pet_ids.is_empty());
    }
}
