//! Concurrent write fan-out
//!
//! A logical operation queues its physical writes here and commits them all
//! at once. Outcomes are classified, never compensated:
//! - every write succeeded: Ok
//! - every write failed: the first store error
//! - mixed: `PartialWrite`, listing what committed and what failed

use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use uuid::Uuid;

use crate::error::{CoordinatorError, StoreResult};
use crate::store::{Record, Repository, StoreKind, WriteTarget};

pub(crate) struct WriteSet {
    operation: &'static str,
    writes: Vec<(WriteTarget, BoxFuture<'static, StoreResult<()>>)>,
}

impl WriteSet {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            writes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    fn push<F>(&mut self, target: WriteTarget, write: F)
    where
        F: Future<Output = StoreResult<()>> + Send + 'static,
    {
        self.writes.push((target, write.boxed()));
    }

    pub fn create<T: Record>(&mut self, store: StoreKind, repo: &Arc<dyn Repository<T>>, record: T) {
        let repo = Arc::clone(repo);
        let target = WriteTarget::new(store, T::RESOURCE, record.id());
        self.push(target, async move { repo.create(&record).await });
    }

    pub fn create_many<T: Record>(
        &mut self,
        store: StoreKind,
        repo: &Arc<dyn Repository<T>>,
        records: Vec<T>,
    ) {
        let repo = Arc::clone(repo);
        let target = WriteTarget::new(store, T::RESOURCE, Uuid::nil());
        self.push(target, async move { repo.create_many(&records).await });
    }

    pub fn update<T: Record>(&mut self, store: StoreKind, repo: &Arc<dyn Repository<T>>, record: T) {
        let repo = Arc::clone(repo);
        let target = WriteTarget::new(store, T::RESOURCE, record.id());
        self.push(target, async move {
            if !repo.update(&record).await? {
                tracing::warn!(
                    %store,
                    resource = T::RESOURCE,
                    id = %record.id(),
                    "update matched nothing; record vanished since it was read"
                );
            }
            Ok(())
        });
    }

    pub fn update_many<T: Record>(
        &mut self,
        store: StoreKind,
        repo: &Arc<dyn Repository<T>>,
        records: Vec<T>,
    ) {
        if records.is_empty() {
            return;
        }
        let repo = Arc::clone(repo);
        let target = WriteTarget::new(store, T::RESOURCE, Uuid::nil());
        self.push(target, async move { repo.update_many(&records).await.map(drop) });
    }

    pub fn delete<T: Record>(&mut self, store: StoreKind, repo: &Arc<dyn Repository<T>>, id: Uuid) {
        let repo = Arc::clone(repo);
        let target = WriteTarget::new(store, T::RESOURCE, id);
        self.push(target, async move { repo.delete(id).await.map(drop) });
    }

    pub fn delete_all<T: Record>(&mut self, store: StoreKind, repo: &Arc<dyn Repository<T>>) {
        let repo = Arc::clone(repo);
        let target = WriteTarget::new(store, T::RESOURCE, Uuid::nil());
        self.push(target, async move { repo.delete_all().await.map(drop) });
    }

    /// Issue every queued write concurrently and wait for all of them.
    pub async fn commit(self) -> Result<(), CoordinatorError> {
        if self.writes.is_empty() {
            return Ok(());
        }

        let operation = self.operation;
        let (targets, writes): (Vec<_>, Vec<_>) = self.writes.into_iter().unzip();
        let results = join_all(writes).await;

        let mut committed = Vec::new();
        let mut failed = Vec::new();
        for (target, result) in targets.into_iter().zip(results) {
            match result {
                Ok(()) => committed.push(target),
                Err(err) => failed.push((target, err)),
            }
        }

        if failed.is_empty() {
            tracing::debug!(operation, writes = committed.len(), "dual write committed");
            return Ok(());
        }

        if committed.is_empty() {
            let (target, err) = failed.swap_remove(0);
            tracing::error!(operation, %target, error = %err, "dual write failed in every store");
            return Err(err.into());
        }

        tracing::error!(
            operation,
            committed = committed.len(),
            failed = failed.len(),
            "partial dual write; committed side left in place"
        );
        Err(CoordinatorError::PartialWrite {
            operation,
            committed,
            failed,
        })
    }
}
