//! The typed failure taxonomy of the flow engine.
//!
//! Every validation check aborts with exactly one of these variants, never a
//! generic error. Message texts are contractually stable: registrar client
//! software pattern-matches on them, so changing one is a breaking protocol
//! change even though the XML stays valid.

use serde::Serialize;
use thiserror::Error;

use epp_registry_proto::{ResourceKind, ResultCode, StatusValue};

use crate::store::StoreError;

/// A flow failure, mapped 1:1 onto an EPP result code.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum FlowError {
    // ── Session ────────────────────────────────────────────
    /// Command requires a logged-in session.
    #[error("Registrar is not logged in")]
    NotLoggedIn,

    /// A second login on an already-established session.
    #[error("Registrar is already logged in")]
    AlreadyLoggedIn,

    /// Login with an unknown client id.
    #[error("Registrar with this client id could not be found: {0}")]
    UnknownRegistrar(String),

    // ── Existence ──────────────────────────────────────────
    /// The target resource is absent (or deleted) at command time.
    #[error("The {} with given ID ({id}) doesn't exist", .kind.display_name())]
    ResourceDoesNotExist { kind: ResourceKind, id: String },

    /// A create collided with an active resource of the same foreign key.
    #[error("Object with given ID ({0}) already exists")]
    ResourceAlreadyExists(String),

    /// A host rename target is already taken.
    #[error("Object with given ID ({0}) already exists")]
    HostAlreadyExists(String),

    /// An update/create references contacts or hosts that are not present.
    #[error("Cannot link to nonexistent resources: {ids:?}")]
    LinkedResourcesDoNotExist { ids: Vec<String> },

    // ── Ownership / authorization ──────────────────────────
    /// The acting registrar does not sponsor the resource.
    #[error("The specified resource belongs to another client")]
    ResourceNotOwned,

    /// The superordinate domain of the host belongs to someone else.
    #[error("Domain for host is sponsored by another registrar")]
    HostDomainNotOwned,

    /// The registrar is not allowed on this TLD.
    #[error("Registrar is not authorized to access the TLD {0}")]
    NotAuthorizedForTld(String),

    /// Auth info did not match the resource.
    #[error("Authorization information for accessing resource is invalid")]
    BadAuthInfo,

    /// Transfer request without auth info.
    #[error("Authorization info is required to request a transfer")]
    MissingTransferAuthInfo,

    /// Transfer cancel from someone other than the gaining registrar.
    #[error("Registrar is not the initiator of this transfer")]
    NotTransferInitiator,

    // ── Status locks ───────────────────────────────────────
    /// A status on the resource forbids this operation.
    #[error("Operation disallowed by status: {0}")]
    StatusProhibitsOperation(StatusValue),

    /// clientUpdateProhibited blocks updates unless the update removes it.
    #[error("Operation disallowed by status: clientUpdateProhibited")]
    ClientUpdateProhibited,

    /// Clients may only set client* statuses.
    #[error("The {0} status cannot be set by clients")]
    StatusNotClientSettable(StatusValue),

    // ── Name syntax ────────────────────────────────────────
    /// Catch-all 2005 family with a specific, stable message.
    #[error("{0}")]
    NameSyntax(String),

    /// 2004 family (lengths, value ranges).
    #[error("{0}")]
    ValueRange(String),

    /// 2306 family (server policy on otherwise valid values).
    #[error("{0}")]
    ValuePolicy(String),

    /// 2003 family (missing required elements).
    #[error("{0}")]
    MissingParameter(String),

    // ── Host business rules ────────────────────────────────
    #[error("Subordinate hosts must have an ip address")]
    SubordinateHostMustHaveIp,

    #[error("External hosts must not have ip addresses")]
    UnexpectedExternalHostIp,

    #[error("Superordinate domain for this hostname is in pending delete")]
    SuperordinateDomainInPendingDelete,

    #[error("External hosts cannot be renamed")]
    CannotRenameExternalHost,

    #[error("Cannot add ip addresses to external hosts")]
    CannotAddIpToExternalHost,

    #[error("Host rename from subordinate to external must also remove all ip addresses")]
    RenameHostToExternalRemoveIp,

    #[error("Cannot remove the last ip address of a subordinate host")]
    CannotRemoveSubordinateHostLastIp,

    // ── Update list rules ──────────────────────────────────
    /// The same value appeared in both an add and a remove list.
    #[error("Cannot add and remove the same value")]
    AddRemoveSameValue,

    // ── Deletion rules ─────────────────────────────────────
    /// Quick smoke check found a domain still referencing the resource.
    #[error("Resource to be deleted is referenced by another resource")]
    ResourceToDeleteIsReferenced,

    #[error("Domain to be deleted has subordinate hosts")]
    DomainToDeleteHasHosts,

    // ── Transfers ──────────────────────────────────────────
    #[error("Object with given ID ({0}) already has a pending transfer")]
    AlreadyPendingTransfer(String),

    #[error("Object with given ID ({0}) does not have a pending transfer")]
    NotPendingTransfer(String),

    #[error("Object is already sponsored by this registrar")]
    ObjectAlreadySponsored,

    #[error("Object has no transfer history")]
    NoTransferHistory,

    #[error("Registrar is not authorized to view transfer status")]
    NotAuthorizedToViewTransfer,

    #[error("Transfers always renew a domain for one year")]
    TransferPeriodMustBeOneYear,

    // ── Cardinality ────────────────────────────────────────
    #[error("Too many resource checks requested in one check command")]
    TooManyResourceChecks,

    #[error("More than 13 nameservers are not allowed")]
    TooManyNameservers,

    // ── Infrastructure ─────────────────────────────────────
    /// The commit coordinator detected a concurrent modification. Safe to
    /// retry from the top; never partially applied.
    #[error("Command failed")]
    ConcurrencyConflict { detail: String },

    /// Store unavailable or other unexpected failure.
    #[error("Command failed")]
    Internal { detail: String },
}

impl FlowError {
    /// The EPP result code this failure reports.
    #[must_use]
    pub const fn code(&self) -> ResultCode {
        match self {
            Self::NotLoggedIn
            | Self::AlreadyLoggedIn
            | Self::ObjectAlreadySponsored
            | Self::NoTransferHistory => ResultCode::CommandUseError,
            Self::ResourceDoesNotExist { .. } | Self::LinkedResourcesDoNotExist { .. } => {
                ResultCode::ObjectDoesNotExist
            }
            Self::ResourceAlreadyExists(_) | Self::HostAlreadyExists(_) => ResultCode::ObjectExists,
            Self::UnknownRegistrar(_)
            | Self::ResourceNotOwned
            | Self::HostDomainNotOwned
            | Self::NotAuthorizedForTld(_)
            | Self::NotTransferInitiator
            | Self::NotAuthorizedToViewTransfer => ResultCode::AuthorizationError,
            Self::BadAuthInfo => ResultCode::InvalidAuthorizationInformation,
            Self::MissingTransferAuthInfo
            | Self::MissingParameter(_)
            | Self::SubordinateHostMustHaveIp => ResultCode::RequiredParameterMissing,
            Self::StatusProhibitsOperation(_)
            | Self::ClientUpdateProhibited
            | Self::SuperordinateDomainInPendingDelete => ResultCode::StatusProhibitsOperation,
            Self::StatusNotClientSettable(_) | Self::NameSyntax(_) => {
                ResultCode::ParameterValueSyntaxError
            }
            Self::ValueRange(_) | Self::UnexpectedExternalHostIp => {
                ResultCode::ParameterValueRangeError
            }
            Self::ValuePolicy(_)
            | Self::CannotRenameExternalHost
            | Self::CannotAddIpToExternalHost
            | Self::RenameHostToExternalRemoveIp
            | Self::CannotRemoveSubordinateHostLastIp
            | Self::AddRemoveSameValue
            | Self::TransferPeriodMustBeOneYear
            | Self::TooManyResourceChecks
            | Self::TooManyNameservers => ResultCode::ParameterValuePolicyError,
            Self::ResourceToDeleteIsReferenced | Self::DomainToDeleteHasHosts => {
                ResultCode::AssociationProhibitsOperation
            }
            Self::AlreadyPendingTransfer(_) => ResultCode::ObjectPendingTransfer,
            Self::NotPendingTransfer(_) => ResultCode::ObjectNotPendingTransfer,
            Self::ConcurrencyConflict { .. } | Self::Internal { .. } => ResultCode::CommandFailed,
        }
    }

    /// Whether this is expected behavior (client error) for log
    /// classification. Level `warn` when `true`, `error` when `false`.
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        !matches!(self, Self::ConcurrencyConflict { .. } | Self::Internal { .. })
    }

    /// Convenience constructor for the existence failure.
    #[must_use]
    pub fn does_not_exist(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::ResourceDoesNotExist {
            kind,
            id: id.into(),
        }
    }
}

impl From<StoreError> for FlowError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(detail) => Self::ConcurrencyConflict { detail },
            StoreError::NotFound(detail) => Self::ConcurrencyConflict {
                detail: format!("entity vanished mid-flow: {detail}"),
            },
            StoreError::Internal(detail) => Self::Internal { detail },
        }
    }
}

/// Flow-layer result alias.
pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_the_documented_taxonomy() {
        assert_eq!(FlowError::NotLoggedIn.code().value(), 2002);
        assert_eq!(
            FlowError::does_not_exist(ResourceKind::Host, "ns1.example.tld")
                .code()
                .value(),
            2303
        );
        assert_eq!(
            FlowError::ResourceAlreadyExists("example.tld".to_string())
                .code()
                .value(),
            2302
        );
        assert_eq!(FlowError::ResourceNotOwned.code().value(), 2201);
        assert_eq!(
            FlowError::StatusProhibitsOperation(StatusValue::ClientDeleteProhibited)
                .code()
                .value(),
            2304
        );
        assert_eq!(FlowError::SubordinateHostMustHaveIp.code().value(), 2003);
        assert_eq!(FlowError::UnexpectedExternalHostIp.code().value(), 2004);
        assert_eq!(FlowError::AddRemoveSameValue.code().value(), 2306);
        assert_eq!(
            FlowError::ConcurrencyConflict {
                detail: "v1 != v2".to_string()
            }
            .code()
            .value(),
            2400
        );
    }

    #[test]
    fn message_texts_are_stable() {
        assert_eq!(
            FlowError::does_not_exist(ResourceKind::Host, "ns1.example.tld").to_string(),
            "The host with given ID (ns1.example.tld) doesn't exist"
        );
        assert_eq!(
            FlowError::ResourceNotOwned.to_string(),
            "The specified resource belongs to another client"
        );
        assert_eq!(
            FlowError::StatusProhibitsOperation(StatusValue::ClientUpdateProhibited).to_string(),
            "Operation disallowed by status: clientUpdateProhibited"
        );
        assert_eq!(
            FlowError::SubordinateHostMustHaveIp.to_string(),
            "Subordinate hosts must have an ip address"
        );
    }

    #[test]
    fn errors_serialize_with_a_stable_tag() {
        let value = serde_json::to_value(&FlowError::ResourceAlreadyExists(
            "example.tld".to_string(),
        ))
        .unwrap();
        assert_eq!(value["code"], "ResourceAlreadyExists");
        assert_eq!(value["details"], "example.tld");
    }

    #[test]
    fn only_infrastructure_failures_are_unexpected() {
        assert!(FlowError::NotLoggedIn.is_expected());
        assert!(FlowError::AddRemoveSameValue.is_expected());
        assert!(!FlowError::ConcurrencyConflict {
            detail: String::new()
        }
        .is_expected());
        assert!(!FlowError::Internal {
            detail: String::new()
        }
        .is_expected());
    }
}
