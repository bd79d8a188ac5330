//! Batched bulk commits for administrative resave tooling.
//!
//! A deliberate weakening of the single-flow atomicity guarantee: when a
//! bulk operation touches many independent entity groups, the writes are
//! partitioned into fixed-size batches, each committed in its own
//! transaction, so one bad batch does not roll back the ones already
//! applied.

use chrono::{DateTime, Utc};

use super::{ResourceStore, Transaction, VersionedWrite};

/// One failed batch, by position in the submitted write list.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub reason: String,
}

/// Aggregate outcome of a batched commit.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub committed_batches: usize,
    pub committed_writes: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Commits `writes` in batches of `batch_size`, continuing past failures.
pub async fn commit_in_batches(
    store: &dyn ResourceStore,
    writes: Vec<VersionedWrite>,
    batch_size: usize,
    now: DateTime<Utc>,
) -> BatchOutcome {
    let batch_size = batch_size.max(1);
    let mut outcome = BatchOutcome::default();
    for (batch_index, chunk) in writes.chunks(batch_size).enumerate() {
        let transaction = Transaction {
            now: Some(now),
            updates: chunk.to_vec(),
            ..Transaction::default()
        };
        match store.transact(transaction).await {
            Ok(_) => {
                outcome.committed_batches += 1;
                outcome.committed_writes += chunk.len();
            }
            Err(e) => {
                log::warn!("batch {batch_index} failed, continuing: {e}");
                outcome.failures.push(BatchFailure {
                    batch_index,
                    reason: e.to_string(),
                });
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;

    use epp_registry_proto::StatusValue;

    use crate::model::{Host, RepoId, Resource, ResourceCommon};
    use crate::store::InMemoryStore;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap()
    }

    fn host(id: u64, name: &str) -> Resource {
        Resource::Host(Host {
            common: ResourceCommon::create(RepoId::new(id, "ROID"), name, "TheRegistrar", t0()),
            addresses: BTreeSet::new(),
            superordinate_domain: None,
            last_superordinate_change: None,
        })
    }

    #[tokio::test]
    async fn failing_batch_does_not_roll_back_prior_batches() {
        let store = InMemoryStore::new();
        let mut writes = Vec::new();
        for id in 1..=4u64 {
            let resource = host(id, &format!("ns{id}.example.tld"));
            store
                .transact(Transaction {
                    now: Some(t0()),
                    creates: vec![resource.clone()],
                    ..Transaction::default()
                })
                .await
                .unwrap();
            let loaded = store.load(resource.repo_id()).await.unwrap().unwrap();
            let mut updated = loaded.resource.clone();
            updated.common_mut().statuses.insert(StatusValue::ServerHold);
            // Poison the second batch with a stale version.
            let expected_version = if id == 3 { 0 } else { loaded.version };
            writes.push(VersionedWrite {
                resource: updated,
                expected_version,
            });
        }

        let outcome = commit_in_batches(&store, writes, 2, t0()).await;
        assert_eq!(outcome.committed_batches, 1);
        assert_eq!(outcome.committed_writes, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].batch_index, 1);

        // Batch one landed and stayed.
        let first = store.load(&RepoId::new(1, "ROID")).await.unwrap().unwrap();
        assert!(first.resource.common().has_status(StatusValue::ServerHold));
        // Batch two (ids 3 and 4) was rejected atomically.
        let fourth = store.load(&RepoId::new(4, "ROID")).await.unwrap().unwrap();
        assert!(!fourth.resource.common().has_status(StatusValue::ServerHold));
    }
}
