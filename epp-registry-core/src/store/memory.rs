//! In-memory store implementation.
//!
//! The default backend for tests and single-node deployments; a real
//! deployment would put a distributed transactional store behind the same
//! trait.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use epp_registry_proto::ResourceKind;

use crate::model::{BillingEvent, Domain, HistoryEntry, PollMessage, RepoId, Tld};

use super::{
    CommitReceipt, ResourceStore, StoreError, StoreResult, Transaction, VersionedResource,
};

#[derive(Default)]
struct Inner {
    commit_seq: u64,
    resources: HashMap<RepoId, VersionedResource>,
    history: Vec<HistoryEntry>,
    polls: HashMap<u64, PollMessage>,
    billing: HashMap<u64, BillingEvent>,
    tlds: HashMap<String, Tld>,
}

/// A tokio-RwLock'd hash-map store with a global commit sequence.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    id_counter: AtomicU64,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            // Start above zero so allocated ids never collide with the
            // default u64 in half-built test fixtures.
            id_counter: AtomicU64::new(1000),
        }
    }

    fn validate(inner: &Inner, transaction: &Transaction) -> StoreResult<()> {
        for (repo_id, expected) in &transaction.expected {
            match inner.resources.get(repo_id) {
                Some(existing) if existing.version == *expected => {}
                Some(existing) => {
                    return Err(StoreError::Conflict(format!(
                        "{repo_id} is at version {}, expected {expected}",
                        existing.version
                    )))
                }
                None => return Err(StoreError::NotFound(repo_id.to_string())),
            }
        }
        for write in &transaction.updates {
            let repo_id = write.resource.repo_id();
            match inner.resources.get(repo_id) {
                Some(existing) if existing.version == write.expected_version => {}
                Some(existing) => {
                    return Err(StoreError::Conflict(format!(
                        "{repo_id} is at version {}, expected {}",
                        existing.version, write.expected_version
                    )))
                }
                None => return Err(StoreError::NotFound(repo_id.to_string())),
            }
        }
        let now = transaction.now.unwrap_or_else(Utc::now);
        for create in &transaction.creates {
            if inner.resources.contains_key(create.repo_id()) {
                return Err(StoreError::Conflict(format!(
                    "repo id {} already exists",
                    create.repo_id()
                )));
            }
            // Backstop for the foreign-key invariant; flows check this with
            // a typed error first.
            if let Some(active) =
                Self::active_by_foreign_key(inner, create.kind(), create.foreign_key(), now)
            {
                if active.resource.repo_id() != create.repo_id() {
                    return Err(StoreError::Conflict(format!(
                        "foreign key {} is actively claimed by {}",
                        create.foreign_key(),
                        active.resource.repo_id()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every stored resource snapshot, for diagnostics and state-diff
    /// assertions in tests.
    pub async fn all_resources(&self) -> Vec<VersionedResource> {
        let mut all: Vec<VersionedResource> =
            self.inner.read().await.resources.values().cloned().collect();
        all.sort_by(|a, b| a.resource.repo_id().cmp(b.resource.repo_id()));
        all
    }

    fn active_by_foreign_key<'a>(
        inner: &'a Inner,
        kind: ResourceKind,
        foreign_key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a VersionedResource> {
        inner.resources.values().find(|v| {
            v.resource.kind() == kind
                && v.resource.foreign_key() == foreign_key
                && v.resource.common().is_active(now)
        })
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn allocate_id(&self) -> u64 {
        self.id_counter.fetch_add(1, Ordering::SeqCst)
    }

    async fn load(&self, repo_id: &RepoId) -> StoreResult<Option<VersionedResource>> {
        Ok(self.inner.read().await.resources.get(repo_id).cloned())
    }

    async fn find_by_foreign_key(
        &self,
        kind: ResourceKind,
        foreign_key: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<VersionedResource>> {
        let inner = self.inner.read().await;
        Ok(Self::active_by_foreign_key(&inner, kind, foreign_key, now).cloned())
    }

    async fn query_domains_by_nameserver(
        &self,
        host_name: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Domain>> {
        let inner = self.inner.read().await;
        Ok(inner
            .resources
            .values()
            .filter_map(|v| v.resource.as_domain())
            .filter(|d| d.common.is_active(now) && d.nameservers.contains(host_name))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn query_domains_by_contact(
        &self,
        contact_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Domain>> {
        let inner = self.inner.read().await;
        Ok(inner
            .resources
            .values()
            .filter_map(|v| v.resource.as_domain())
            .filter(|d| {
                d.common.is_active(now)
                    && (d.registrant == contact_id
                        || d.contacts.iter().any(|(_, id)| id == contact_id))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn transact(&self, transaction: Transaction) -> StoreResult<CommitReceipt> {
        let mut inner = self.inner.write().await;
        Self::validate(&inner, &transaction)?;

        inner.commit_seq += 1;
        let version = inner.commit_seq;
        for create in transaction.creates {
            inner.resources.insert(
                create.repo_id().clone(),
                VersionedResource {
                    resource: create,
                    version,
                },
            );
        }
        for write in transaction.updates {
            inner.resources.insert(
                write.resource.repo_id().clone(),
                VersionedResource {
                    resource: write.resource,
                    version,
                },
            );
        }
        inner.history.extend(transaction.history);
        for poll in transaction.polls {
            inner.polls.insert(poll.id, poll);
        }
        for id in transaction.poll_deletes {
            inner.polls.remove(&id);
        }
        for event in transaction.billing {
            inner.billing.insert(event.id, event);
        }
        for id in transaction.billing_deletes {
            inner.billing.remove(&id);
        }
        Ok(CommitReceipt { version })
    }

    async fn get_tld(&self, tld: &str) -> StoreResult<Option<Tld>> {
        Ok(self.inner.read().await.tlds.get(tld).cloned())
    }

    async fn put_tld(&self, tld: Tld) -> StoreResult<()> {
        self.inner.write().await.tlds.insert(tld.tld.clone(), tld);
        Ok(())
    }

    async fn list_tlds(&self) -> StoreResult<Vec<Tld>> {
        let mut tlds: Vec<Tld> = self.inner.read().await.tlds.values().cloned().collect();
        tlds.sort_by(|a, b| a.tld.cmp(&b.tld));
        Ok(tlds)
    }

    async fn history_of(&self, repo_id: &RepoId) -> StoreResult<Vec<HistoryEntry>> {
        Ok(self
            .inner
            .read()
            .await
            .history
            .iter()
            .filter(|h| &h.parent == repo_id)
            .cloned()
            .collect())
    }

    async fn poll_messages_for(&self, registrar_id: &str) -> StoreResult<Vec<PollMessage>> {
        let mut messages: Vec<PollMessage> = self
            .inner
            .read()
            .await
            .polls
            .values()
            .filter(|p| p.registrar_id == registrar_id)
            .cloned()
            .collect();
        messages.sort_by_key(|p| (p.event_time, p.id));
        Ok(messages)
    }

    async fn billing_events_of(&self, repo_id: &RepoId) -> StoreResult<Vec<BillingEvent>> {
        let mut events: Vec<BillingEvent> = self
            .inner
            .read()
            .await
            .billing
            .values()
            .filter(|b| &b.parent == repo_id)
            .cloned()
            .collect();
        events.sort_by_key(|b| b.id);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;

    use crate::model::{end_of_time, Host, Resource, ResourceCommon};
    use crate::store::VersionedWrite;

    use super::*;

    fn host(repo_id: u64, name: &str, created: DateTime<Utc>) -> Resource {
        Resource::Host(Host {
            common: ResourceCommon::create(RepoId::new(repo_id, "ROID"), name, "TheRegistrar", created),
            addresses: BTreeSet::new(),
            superordinate_domain: None,
            last_superordinate_change: None,
        })
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn create_and_load_round_trip() {
        let store = InMemoryStore::new();
        let resource = host(1, "ns1.example.tld", t0());
        let tx = Transaction {
            now: Some(t0()),
            creates: vec![resource.clone()],
            ..Transaction::default()
        };
        let receipt = store.transact(tx).await.unwrap();
        let loaded = store.load(resource.repo_id()).await.unwrap().unwrap();
        assert_eq!(loaded.version, receipt.version);
        assert_eq!(loaded.resource, resource);
    }

    #[tokio::test]
    async fn stale_version_is_rejected_without_partial_apply() {
        let store = InMemoryStore::new();
        let resource = host(1, "ns1.example.tld", t0());
        store
            .transact(Transaction {
                now: Some(t0()),
                creates: vec![resource.clone()],
                ..Transaction::default()
            })
            .await
            .unwrap();
        let v1 = store.load(resource.repo_id()).await.unwrap().unwrap();

        // Another actor commits first.
        let mut updated = v1.resource.clone();
        updated.common_mut().touch("TheRegistrar", t0());
        store
            .transact(Transaction {
                now: Some(t0()),
                updates: vec![VersionedWrite {
                    resource: updated,
                    expected_version: v1.version,
                }],
                ..Transaction::default()
            })
            .await
            .unwrap();

        // The original flow now tries to commit against the stale version,
        // together with a second create that must not land either.
        let result = store
            .transact(Transaction {
                now: Some(t0()),
                creates: vec![host(2, "ns2.example.tld", t0())],
                updates: vec![VersionedWrite {
                    resource: v1.resource.clone(),
                    expected_version: v1.version,
                }],
                ..Transaction::default()
            })
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(store
            .find_by_foreign_key(ResourceKind::Host, "ns2.example.tld", t0())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn foreign_key_resolves_only_active_resources() {
        let store = InMemoryStore::new();
        let mut resource = host(1, "ns1.example.tld", t0());
        resource.common_mut().deletion_time = t0() + chrono::Duration::days(1);
        store
            .transact(Transaction {
                now: Some(t0()),
                creates: vec![resource],
                ..Transaction::default()
            })
            .await
            .unwrap();
        assert!(store
            .find_by_foreign_key(ResourceKind::Host, "ns1.example.tld", t0())
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_foreign_key(
                ResourceKind::Host,
                "ns1.example.tld",
                t0() + chrono::Duration::days(2)
            )
            .await
            .unwrap()
            .is_none());
        // A new resource may claim the retired name.
        store
            .transact(Transaction {
                now: Some(t0() + chrono::Duration::days(2)),
                creates: vec![host(2, "ns1.example.tld", t0() + chrono::Duration::days(2))],
                ..Transaction::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_over_active_foreign_key_conflicts() {
        let store = InMemoryStore::new();
        store
            .transact(Transaction {
                now: Some(t0()),
                creates: vec![host(1, "ns1.example.tld", t0())],
                ..Transaction::default()
            })
            .await
            .unwrap();
        let result = store
            .transact(Transaction {
                now: Some(t0()),
                creates: vec![host(2, "ns1.example.tld", t0())],
                ..Transaction::default()
            })
            .await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn end_of_time_resources_never_expire_from_index() {
        let store = InMemoryStore::new();
        let resource = host(1, "ns1.example.tld", t0());
        assert_eq!(resource.common().deletion_time, end_of_time());
        store
            .transact(Transaction {
                now: Some(t0()),
                creates: vec![resource],
                ..Transaction::default()
            })
            .await
            .unwrap();
        assert!(store
            .find_by_foreign_key(
                ResourceKind::Host,
                "ns1.example.tld",
                t0() + chrono::Duration::days(365 * 100)
            )
            .await
            .unwrap()
            .is_some());
    }
}
