//! The shared status-value vocabulary for domains, hosts and contacts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// A status value attached to a resource, per RFC 5731–5733.
///
/// Wire names are camelCase ("clientUpdateProhibited"). The `Ok`, `Inactive`
/// and `Linked` values are virtual: they are computed at info time and never
/// stored on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusValue {
    Ok,
    Inactive,
    Linked,
    ClientCreateProhibited,
    ClientDeleteProhibited,
    ClientHold,
    ClientRenewProhibited,
    ClientTransferProhibited,
    ClientUpdateProhibited,
    PendingCreate,
    PendingDelete,
    PendingTransfer,
    PendingUpdate,
    ServerCreateProhibited,
    ServerDeleteProhibited,
    ServerHold,
    ServerRenewProhibited,
    ServerTransferProhibited,
    ServerUpdateProhibited,
}

impl StatusValue {
    /// The camelCase name used in XML documents.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Inactive => "inactive",
            Self::Linked => "linked",
            Self::ClientCreateProhibited => "clientCreateProhibited",
            Self::ClientDeleteProhibited => "clientDeleteProhibited",
            Self::ClientHold => "clientHold",
            Self::ClientRenewProhibited => "clientRenewProhibited",
            Self::ClientTransferProhibited => "clientTransferProhibited",
            Self::ClientUpdateProhibited => "clientUpdateProhibited",
            Self::PendingCreate => "pendingCreate",
            Self::PendingDelete => "pendingDelete",
            Self::PendingTransfer => "pendingTransfer",
            Self::PendingUpdate => "pendingUpdate",
            Self::ServerCreateProhibited => "serverCreateProhibited",
            Self::ServerDeleteProhibited => "serverDeleteProhibited",
            Self::ServerHold => "serverHold",
            Self::ServerRenewProhibited => "serverRenewProhibited",
            Self::ServerTransferProhibited => "serverTransferProhibited",
            Self::ServerUpdateProhibited => "serverUpdateProhibited",
        }
    }

    /// Whether registrar clients may add or remove this status themselves.
    ///
    /// Only the client* prohibitions and holds are client-settable; pending*
    /// and server* statuses are managed exclusively by the registry.
    #[must_use]
    pub const fn is_client_settable(self) -> bool {
        matches!(
            self,
            Self::ClientCreateProhibited
                | Self::ClientDeleteProhibited
                | Self::ClientHold
                | Self::ClientRenewProhibited
                | Self::ClientTransferProhibited
                | Self::ClientUpdateProhibited
        )
    }

    /// Whether this status is computed at read time rather than stored.
    #[must_use]
    pub const fn is_virtual(self) -> bool {
        matches!(self, Self::Ok | Self::Inactive | Self::Linked)
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for StatusValue {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = match s {
            "ok" => Self::Ok,
            "inactive" => Self::Inactive,
            "linked" => Self::Linked,
            "clientCreateProhibited" => Self::ClientCreateProhibited,
            "clientDeleteProhibited" => Self::ClientDeleteProhibited,
            "clientHold" => Self::ClientHold,
            "clientRenewProhibited" => Self::ClientRenewProhibited,
            "clientTransferProhibited" => Self::ClientTransferProhibited,
            "clientUpdateProhibited" => Self::ClientUpdateProhibited,
            "pendingCreate" => Self::PendingCreate,
            "pendingDelete" => Self::PendingDelete,
            "pendingTransfer" => Self::PendingTransfer,
            "pendingUpdate" => Self::PendingUpdate,
            "serverCreateProhibited" => Self::ServerCreateProhibited,
            "serverDeleteProhibited" => Self::ServerDeleteProhibited,
            "serverHold" => Self::ServerHold,
            "serverRenewProhibited" => Self::ServerRenewProhibited,
            "serverTransferProhibited" => Self::ServerTransferProhibited,
            "serverUpdateProhibited" => Self::ServerUpdateProhibited,
            other => {
                return Err(ProtoError::BadAttribute {
                    element: "status".to_string(),
                    attribute: "s".to_string(),
                    detail: format!("unknown status value: {other}"),
                })
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for status in [
            StatusValue::Ok,
            StatusValue::ClientUpdateProhibited,
            StatusValue::PendingDelete,
            StatusValue::ServerTransferProhibited,
        ] {
            assert_eq!(status.wire_name().parse::<StatusValue>().unwrap(), status);
        }
    }

    #[test]
    fn client_settable_excludes_server_and_pending() {
        assert!(StatusValue::ClientHold.is_client_settable());
        assert!(!StatusValue::ServerHold.is_client_settable());
        assert!(!StatusValue::PendingDelete.is_client_settable());
        assert!(!StatusValue::Ok.is_client_settable());
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("clientFrobProhibited".parse::<StatusValue>().is_err());
    }
}
