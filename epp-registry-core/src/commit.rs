//! The transactional commit coordinator.
//!
//! Flows stage every entity change into a [`StagedMutation`]; nothing is
//! applied until `commit` hands the whole set to the store in one
//! transaction. Side effects that must not fire on a doomed attempt — DNS
//! refreshes and async tasks — are held back until the transaction returns
//! successfully.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{FlowError, FlowResult};
use crate::model::{BillingEvent, HistoryEntry, PollMessage, RepoId, Resource};
use crate::store::{CommitReceipt, ResourceStore, Transaction, VersionedWrite};
use crate::tasks::{AsyncTask, AsyncTaskQueue, DnsRefreshRequest, DnsTaskQueue};

/// Every entity change and post-commit side effect of one flow execution.
#[derive(Debug, Clone, Default)]
pub struct StagedMutation {
    /// Version assertions for entities read during validation but not
    /// themselves written.
    pub expected: Vec<(RepoId, u64)>,
    pub creates: Vec<Resource>,
    pub updates: Vec<VersionedWrite>,
    pub history: Vec<HistoryEntry>,
    pub polls: Vec<PollMessage>,
    pub poll_deletes: Vec<u64>,
    pub billing: Vec<BillingEvent>,
    pub billing_deletes: Vec<u64>,
    dns_refreshes: Vec<DnsRefreshRequest>,
    pub async_tasks: Vec<AsyncTask>,
}

impl StagedMutation {
    /// Stages a DNS refresh, deduplicated by name within this flow: a
    /// rename that touches a hostname through two paths still publishes
    /// exactly one task for it.
    pub fn stage_dns_refresh(&mut self, request: DnsRefreshRequest) {
        if !self.dns_refreshes.iter().any(|r| r.name == request.name) {
            self.dns_refreshes.push(request);
        }
    }

    #[must_use]
    pub fn dns_refreshes(&self) -> &[DnsRefreshRequest] {
        &self.dns_refreshes
    }
}

/// Commits a staged mutation atomically, then fires queued side effects.
///
/// A version mismatch on any staged entity fails the whole attempt with
/// [`FlowError::ConcurrencyConflict`]; nothing is applied and no side
/// effect fires. The coordinator never retries — idempotent retry is the
/// caller's decision at the protocol level.
pub async fn commit(
    store: &Arc<dyn ResourceStore>,
    dns_queue: &Arc<dyn DnsTaskQueue>,
    async_queue: &Arc<dyn AsyncTaskQueue>,
    now: DateTime<Utc>,
    staged: StagedMutation,
) -> FlowResult<CommitReceipt> {
    let transaction = Transaction {
        now: Some(now),
        expected: staged.expected,
        creates: staged.creates,
        updates: staged.updates,
        history: staged.history,
        polls: staged.polls,
        poll_deletes: staged.poll_deletes,
        billing: staged.billing,
        billing_deletes: staged.billing_deletes,
    };
    let receipt = match store.transact(transaction).await {
        Ok(receipt) => receipt,
        Err(e) => {
            let flow_error = FlowError::from(e);
            if flow_error.is_expected() {
                log::warn!("commit rejected: {flow_error}");
            } else {
                log::error!("commit failed: {flow_error}");
            }
            return Err(flow_error);
        }
    };

    // Gated on success only: these fire after the transaction returns and
    // never if it aborted.
    for request in staged.dns_refreshes {
        dns_queue.enqueue_refresh(request).await;
    }
    for task in staged.async_tasks {
        async_queue.enqueue(task).await;
    }
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::TimeZone;

    use crate::model::{Host, ResourceCommon};
    use crate::store::InMemoryStore;
    use crate::tasks::{DnsTargetKind, InMemoryAsyncQueue, InMemoryDnsQueue};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 0, 0, 0).unwrap()
    }

    fn refresh(name: &str) -> DnsRefreshRequest {
        DnsRefreshRequest {
            name: name.to_string(),
            kind: DnsTargetKind::Host,
            tld: "tld".to_string(),
        }
    }

    fn queues() -> (
        Arc<dyn ResourceStore>,
        Arc<InMemoryDnsQueue>,
        Arc<InMemoryAsyncQueue>,
    ) {
        (
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryDnsQueue::new()),
            Arc::new(InMemoryAsyncQueue::new()),
        )
    }

    #[test]
    fn dns_refreshes_are_deduplicated_per_flow() {
        let mut staged = StagedMutation::default();
        staged.stage_dns_refresh(refresh("ns1.example.tld"));
        staged.stage_dns_refresh(refresh("ns2.example.tld"));
        staged.stage_dns_refresh(refresh("ns1.example.tld"));
        assert_eq!(staged.dns_refreshes().len(), 2);
    }

    #[tokio::test]
    async fn side_effects_fire_only_after_successful_commit() {
        let (store, dns, async_queue) = queues();
        let mut staged = StagedMutation::default();
        staged.creates.push(Resource::Host(Host {
            common: ResourceCommon::create(
                RepoId::new(1, "ROID"),
                "ns1.example.tld",
                "TheRegistrar",
                t0(),
            ),
            addresses: BTreeSet::new(),
            superordinate_domain: Some("example.tld".to_string()),
            last_superordinate_change: None,
        }));
        staged.stage_dns_refresh(refresh("ns1.example.tld"));

        let dns_trait: Arc<dyn DnsTaskQueue> = dns.clone();
        let async_trait_queue: Arc<dyn AsyncTaskQueue> = async_queue.clone();
        commit(&store, &dns_trait, &async_trait_queue, t0(), staged)
            .await
            .unwrap();
        assert_eq!(dns.drain().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_commit_fires_nothing() {
        let (store, dns, async_queue) = queues();
        let mut staged = StagedMutation::default();
        // Version assertion on an entity that does not exist.
        staged
            .expected
            .push((RepoId::new(99, "ROID"), 1));
        staged.stage_dns_refresh(refresh("ns1.example.tld"));

        let dns_trait: Arc<dyn DnsTaskQueue> = dns.clone();
        let async_trait_queue: Arc<dyn AsyncTaskQueue> = async_queue.clone();
        let result = commit(&store, &dns_trait, &async_trait_queue, t0(), staged).await;
        assert!(matches!(
            result,
            Err(FlowError::ConcurrencyConflict { .. })
        ));
        assert!(dns.drain().await.is_empty());
        assert!(async_queue.drain().await.is_empty());
    }
}
