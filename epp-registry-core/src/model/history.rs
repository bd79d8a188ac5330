//! Immutable audit records, one per mutating flow execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::RepoId;

/// The command that produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryType {
    ContactCreate,
    ContactDelete,
    ContactPendingDelete,
    ContactDeleteFailure,
    ContactUpdate,
    DomainCreate,
    DomainDelete,
    DomainRenew,
    DomainTransferApprove,
    DomainTransferCancel,
    DomainTransferReject,
    DomainTransferRequest,
    DomainUpdate,
    HostCreate,
    HostDelete,
    HostPendingDelete,
    HostDeleteFailure,
    HostUpdate,
}

/// An audit record parented by exactly one resource.
///
/// History entries are write-once: flows create them inside the same
/// transaction as the resource mutation and nothing ever updates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    /// Owning resource.
    pub parent: RepoId,
    pub history_type: HistoryType,
    /// The acting registrar.
    pub registrar_id: String,
    pub modification_time: DateTime<Utc>,
    /// Losing registrar on transfers, requesting registrar on async deletes.
    pub other_registrar_id: Option<String>,
    pub client_trid: Option<String>,
    pub reason: Option<String>,
}
