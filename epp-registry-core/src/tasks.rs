//! Fire-and-forget task queues consumed by external collaborators.
//!
//! The DNS queue feeds the (out-of-scope) zone writer; the async queue feeds
//! the deferred-deletion/rename worker in [`crate::async_ops`]. Both are
//! at-least-once: enqueues fire only after a successful commit, and the
//! consumers tolerate duplicates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use epp_registry_proto::ResourceKind;

use crate::model::RepoId;

/// What a DNS refresh targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsTargetKind {
    Domain,
    Host,
}

/// A request to re-publish DNS data for one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRefreshRequest {
    pub name: String,
    pub kind: DnsTargetKind,
    pub tld: String,
}

/// DNS update queue.
#[async_trait]
pub trait DnsTaskQueue: Send + Sync {
    async fn enqueue_refresh(&self, request: DnsRefreshRequest);
}

/// Deferred work the flow engine cannot complete synchronously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AsyncTask {
    /// Referential-safety scan and actual deletion of a resource the delete
    /// flow optimistically marked pendingDelete.
    ResourceDeletion {
        kind: ResourceKind,
        repo_id: RepoId,
        requesting_registrar: String,
        client_trid: Option<String>,
        is_superuser: bool,
        requested_time: DateTime<Utc>,
    },
    /// Carry-over of references and NS re-publication on domains that still
    /// point at a renamed host's old name.
    HostRename {
        repo_id: RepoId,
        old_name: String,
        requested_time: DateTime<Utc>,
    },
}

/// Async work queue.
#[async_trait]
pub trait AsyncTaskQueue: Send + Sync {
    async fn enqueue(&self, task: AsyncTask);
}

/// In-memory DNS queue; `drain()` hands the backlog to the consumer (or a
/// test assertion).
#[derive(Default)]
pub struct InMemoryDnsQueue {
    queue: Mutex<Vec<DnsRefreshRequest>>,
}

impl InMemoryDnsQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drain(&self) -> Vec<DnsRefreshRequest> {
        std::mem::take(&mut *self.queue.lock().await)
    }
}

#[async_trait]
impl DnsTaskQueue for InMemoryDnsQueue {
    async fn enqueue_refresh(&self, request: DnsRefreshRequest) {
        log::debug!("dns refresh enqueued for {}", request.name);
        self.queue.lock().await.push(request);
    }
}

/// In-memory async task queue.
#[derive(Default)]
pub struct InMemoryAsyncQueue {
    queue: Mutex<Vec<AsyncTask>>,
}

impl InMemoryAsyncQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn drain(&self) -> Vec<AsyncTask> {
        std::mem::take(&mut *self.queue.lock().await)
    }
}

#[async_trait]
impl AsyncTaskQueue for InMemoryAsyncQueue {
    async fn enqueue(&self, task: AsyncTask) {
        self.queue.lock().await.push(task);
    }
}
