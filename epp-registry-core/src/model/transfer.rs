//! Transfer state machine embedded in transferable resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The resolution state of a transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferStatus {
    Pending,
    ClientApproved,
    ClientCancelled,
    ClientRejected,
    ServerApproved,
    ServerCancelled,
}

impl TransferStatus {
    /// Wire-format name used in `<domain:trStatus>`.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ClientApproved => "clientApproved",
            Self::ClientCancelled => "clientCancelled",
            Self::ClientRejected => "clientRejected",
            Self::ServerApproved => "serverApproved",
            Self::ServerCancelled => "serverCancelled",
        }
    }
}

/// Embedded transfer bookkeeping.
///
/// While a transfer is pending, the ids of the speculative server-approve
/// entities (billing event and poll messages written with future event
/// times) are recorded here so an explicit approve/reject/cancel can delete
/// them again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferData {
    pub status: Option<TransferStatus>,
    pub gaining_registrar: Option<String>,
    pub losing_registrar: Option<String>,
    pub request_time: Option<DateTime<Utc>>,
    pub request_trid: Option<String>,
    /// When a pending transfer auto-resolves in the gaining registrar's
    /// favor unless the losing registrar acts first.
    pub pending_expiration_time: Option<DateTime<Utc>>,
    pub period_years: u32,
    /// Expiration the domain will carry if the transfer is server-approved.
    pub server_approve_new_expiration: Option<DateTime<Utc>>,
    pub server_approve_billing_id: Option<u64>,
    pub server_approve_autorenew_billing_id: Option<u64>,
    pub server_approve_poll_ids: Vec<u64>,
}

impl TransferData {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == Some(TransferStatus::Pending)
    }

    /// Ids of all staged server-approve entities, for cancellation.
    #[must_use]
    pub fn staged_entity_ids(&self) -> Vec<u64> {
        let mut ids = self.server_approve_poll_ids.clone();
        ids.extend(self.server_approve_billing_id);
        ids.extend(self.server_approve_autorenew_billing_id);
        ids
    }

    /// The post-resolution copy of this data: staged entity references are
    /// cleared, the final status recorded.
    #[must_use]
    pub fn resolve(&self, status: TransferStatus) -> Self {
        Self {
            status: Some(status),
            server_approve_new_expiration: None,
            server_approve_billing_id: None,
            server_approve_autorenew_billing_id: None,
            server_approve_poll_ids: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_clears_staged_entities() {
        let data = TransferData {
            status: Some(TransferStatus::Pending),
            gaining_registrar: Some("NewRegistrar".to_string()),
            losing_registrar: Some("TheRegistrar".to_string()),
            server_approve_billing_id: Some(7),
            server_approve_poll_ids: vec![8, 9],
            period_years: 1,
            ..TransferData::default()
        };
        assert_eq!(data.staged_entity_ids(), vec![8, 9, 7]);
        let resolved = data.resolve(TransferStatus::ClientRejected);
        assert_eq!(resolved.status, Some(TransferStatus::ClientRejected));
        assert!(resolved.staged_entity_ids().is_empty());
        assert_eq!(resolved.gaining_registrar.as_deref(), Some("NewRegistrar"));
    }
}
