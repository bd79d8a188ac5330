//! Per-TLD registry configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration for one managed TLD.
///
/// Read-mostly reference data, served through the [`crate::config::TldCache`]
/// as point-in-time snapshots; administrative tooling mutates it and calls
/// `invalidate()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tld {
    /// The TLD string without a leading dot, e.g. "tld" or "co.test".
    pub tld: String,
    /// Suffix baked into repo ids allocated under this TLD.
    pub roid_suffix: String,
    /// How long a pending transfer waits before server auto-approval.
    pub automatic_transfer_days: i64,
    /// Redemption window after a delete before the name is purged.
    pub redemption_grace_period_days: i64,
    /// Pending-delete tail after redemption.
    pub pending_delete_days: i64,
    /// Grace window after an autorenew during which a delete refunds it.
    pub autorenew_grace_period_days: i64,
    /// Grace window after a create during which a delete is immediate.
    pub add_grace_period_days: i64,
    /// Grace window after an explicit renew.
    pub renew_grace_period_days: i64,
    /// Grace window after a transfer completes.
    pub transfer_grace_period_days: i64,
    /// Upper bound on registration periods, in years.
    pub max_registration_years: u32,
}

impl Tld {
    /// A TLD with production-default policy windows.
    #[must_use]
    pub fn new(tld: impl Into<String>) -> Self {
        let tld = tld.into();
        let roid_suffix = tld.replace('.', "").to_uppercase();
        Self {
            tld,
            roid_suffix,
            automatic_transfer_days: 5,
            redemption_grace_period_days: 30,
            pending_delete_days: 5,
            autorenew_grace_period_days: 45,
            add_grace_period_days: 5,
            renew_grace_period_days: 5,
            transfer_grace_period_days: 5,
            max_registration_years: 10,
        }
    }

    #[must_use]
    pub fn automatic_transfer_length(&self) -> Duration {
        Duration::days(self.automatic_transfer_days)
    }

    #[must_use]
    pub fn redemption_grace_period(&self) -> Duration {
        Duration::days(self.redemption_grace_period_days)
    }

    #[must_use]
    pub fn pending_delete_length(&self) -> Duration {
        Duration::days(self.pending_delete_days)
    }

    #[must_use]
    pub fn add_grace_period(&self) -> Duration {
        Duration::days(self.add_grace_period_days)
    }

    #[must_use]
    pub fn renew_grace_period(&self) -> Duration {
        Duration::days(self.renew_grace_period_days)
    }

    #[must_use]
    pub fn transfer_grace_period(&self) -> Duration {
        Duration::days(self.transfer_grace_period_days)
    }

    /// Number of labels in this TLD (multi-part TLDs like "co.test" have 2).
    #[must_use]
    pub fn label_count(&self) -> usize {
        self.tld.split('.').count()
    }
}
