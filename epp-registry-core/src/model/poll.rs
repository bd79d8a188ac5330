//! Queued registrar notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::RepoId;

/// Delivery shape of a poll message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PollMessageKind {
    /// Delivered once when `event_time` passes.
    OneTime,
    /// Autorenew reminder repeating yearly until `recurrence_end`.
    Autorenew { recurrence_end: DateTime<Utc> },
}

/// A message queued for a registrar.
///
/// Created and cancelled by the flow engine; consumption (poll req/ack) is
/// a separate surface. Messages become visible once `event_time` <= now,
/// which is how transfer flows stage speculative server-approve
/// notifications that only materialize if nobody acts first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollMessage {
    pub id: u64,
    /// Receiving registrar.
    pub registrar_id: String,
    /// Owning resource.
    pub parent: RepoId,
    pub event_time: DateTime<Utc>,
    pub message: String,
    pub kind: PollMessageKind,
}
