//! Billing event records produced by mutation builders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::resource::RepoId;

/// Why a one-time charge exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingReason {
    Create,
    Renew,
    Transfer,
    Restore,
}

/// The charge shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BillingKind {
    /// A single charge, billable at `billing_time` (which trails the event
    /// by the relevant grace period).
    OneTime {
        reason: BillingReason,
        period_years: u32,
        billing_time: DateTime<Utc>,
    },
    /// Open-ended yearly autorenew charge, closed by setting
    /// `recurrence_end` when the domain is deleted or transferred.
    Recurring { recurrence_end: DateTime<Utc> },
    /// Cancels a previously written one-time charge (grace-period refund).
    Cancellation { cancelled_event_id: u64 },
}

/// A charge record associated with a registrar and a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingEvent {
    pub id: u64,
    /// Billed registrar.
    pub registrar_id: String,
    /// Owning domain.
    pub parent: RepoId,
    pub event_time: DateTime<Utc>,
    pub kind: BillingKind,
}
