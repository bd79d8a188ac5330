//! Transactional resource-store abstraction.
//!
//! The flow engine treats persistence as a generic versioned key-value store
//! with optimistic concurrency: every entity read during validation carries
//! the version it was read at, and [`ResourceStore::transact`] refuses the
//! whole write set if any of those versions moved in the meantime. There is
//! no lock; contention resolves by failing the losing command.

mod batch;
mod memory;

pub use batch::{commit_in_batches, BatchFailure, BatchOutcome};
pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use epp_registry_proto::ResourceKind;

use crate::model::{
    BillingEvent, Domain, HistoryEntry, PollMessage, RepoId, Resource, Tld,
};

/// Storage-layer errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An expected version did not match, or a create collided with an
    /// active resource. Nothing was applied; the command may be retried
    /// from the top.
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// An update or delete referenced an entity that is not present.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Backend failure (i/o, serialization).
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Storage-layer result alias.
pub type StoreResult<T> = Result<T, StoreError>;

/// A resource snapshot together with the commit version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedResource {
    pub resource: Resource,
    pub version: u64,
}

/// A resource write carrying the version the old copy was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedWrite {
    pub resource: Resource,
    pub expected_version: u64,
}

/// The staged write set of one flow execution.
///
/// `now` is the flow's logical transaction time; the store uses it for the
/// active-foreign-key uniqueness check on creates.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    pub now: Option<DateTime<Utc>>,
    /// Version assertions for entities read but not written.
    pub expected: Vec<(RepoId, u64)>,
    pub creates: Vec<Resource>,
    pub updates: Vec<VersionedWrite>,
    pub history: Vec<HistoryEntry>,
    pub polls: Vec<PollMessage>,
    /// Staged server-approve entities withdrawn by explicit transfer
    /// resolution.
    pub poll_deletes: Vec<u64>,
    pub billing: Vec<BillingEvent>,
    pub billing_deletes: Vec<u64>,
}

impl Transaction {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty()
            && self.updates.is_empty()
            && self.history.is_empty()
            && self.polls.is_empty()
            && self.poll_deletes.is_empty()
            && self.billing.is_empty()
            && self.billing_deletes.is_empty()
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    /// The commit sequence number; written resources now carry this version.
    pub version: u64,
}

/// The transactional key-value store holding versioned resource snapshots.
///
/// Implementations must apply [`ResourceStore::transact`] atomically: either
/// every staged change lands under one new commit version, or none do.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Allocates a fresh numeric id (repo ids, history/poll/billing ids).
    async fn allocate_id(&self) -> u64;

    /// Loads the current snapshot of a resource by repo id.
    async fn load(&self, repo_id: &RepoId) -> StoreResult<Option<VersionedResource>>;

    /// Resolves a foreign key to the resource actively claiming it at
    /// `now`. The foreign-key index maps to at most one active resource at
    /// any instant; renames and deletions retire mappings atomically with
    /// the commit that causes them.
    async fn find_by_foreign_key(
        &self,
        kind: ResourceKind,
        foreign_key: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<VersionedResource>>;

    /// Domains (active at `now`) referencing the named host as a
    /// nameserver, up to `limit`.
    async fn query_domains_by_nameserver(
        &self,
        host_name: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Domain>>;

    /// Domains (active at `now`) referencing the contact id, up to `limit`.
    async fn query_domains_by_contact(
        &self,
        contact_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Domain>>;

    /// Atomically applies a staged write set.
    async fn transact(&self, transaction: Transaction) -> StoreResult<CommitReceipt>;

    // ── Reference data ─────────────────────────────────────

    async fn get_tld(&self, tld: &str) -> StoreResult<Option<Tld>>;
    async fn put_tld(&self, tld: Tld) -> StoreResult<()>;
    async fn list_tlds(&self) -> StoreResult<Vec<Tld>>;

    // ── Owned-entity reads (audit, poll delivery, tests) ───

    async fn history_of(&self, repo_id: &RepoId) -> StoreResult<Vec<HistoryEntry>>;
    async fn poll_messages_for(&self, registrar_id: &str) -> StoreResult<Vec<PollMessage>>;
    async fn billing_events_of(&self, repo_id: &RepoId) -> StoreResult<Vec<BillingEvent>>;
}
