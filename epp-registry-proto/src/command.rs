//! Typed model of inbound EPP commands.
//!
//! One variant per (verb, object) pair the server implements. The XML codec
//! guarantees payload consistency at parse time, so flows can match a single
//! enum without re-checking which object namespace a payload came from.

use serde::{Deserialize, Serialize};

use crate::status::StatusValue;

/// A top-level EPP frame from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EppCommand {
    /// `<hello/>` — request a fresh greeting.
    Hello,
    /// `<login>` with registrar credentials.
    Login(Login),
    /// `<logout/>` — end the session.
    Logout { cl_trid: Option<String> },
    /// A resource command wrapped in `<command>`, with its client trid.
    Resource {
        command: ResourceCommand,
        cl_trid: Option<String>,
    },
}

impl EppCommand {
    /// The client transaction id, when one was supplied.
    #[must_use]
    pub fn cl_trid(&self) -> Option<&str> {
        match self {
            Self::Hello => None,
            Self::Login(login) => login.cl_trid.as_deref(),
            Self::Logout { cl_trid } | Self::Resource { cl_trid, .. } => cl_trid.as_deref(),
        }
    }
}

/// `<login>` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    pub registrar_id: String,
    pub password: String,
    pub new_password: Option<String>,
    /// Client trid on the wrapping `<command>`.
    pub cl_trid: Option<String>,
}

/// The object namespace a command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Domain,
    Host,
    Contact,
}

impl ResourceKind {
    /// Lowercase display name, used in error messages ("The host with ...").
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Host => "host",
            Self::Contact => "contact",
        }
    }
}

/// A transfer sub-operation (`op` attribute on `<transfer>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOp {
    Request,
    Approve,
    Reject,
    Cancel,
    Query,
}

/// A registration period. EPP allows a unit attribute; the registry only
/// accepts years, but the check happens in the flow layer so the error
/// message stays in the documented taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub value: u32,
    pub unit: PeriodUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Years,
    Months,
}

impl Default for Period {
    fn default() -> Self {
        Self {
            value: 1,
            unit: PeriodUnit::Years,
        }
    }
}

/// Generic add/remove lists for update commands.
///
/// `statuses` are shared by all three object types; `values` carries the
/// object-specific items (IP addresses for hosts, nameserver names for
/// domains) as canonical strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAddRemove {
    pub values: Vec<String>,
    pub statuses: Vec<StatusValue>,
}

impl UpdateAddRemove {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.statuses.is_empty()
    }
}

/// `<domain:create>` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCreate {
    pub name: String,
    pub period: Period,
    pub registrant: String,
    /// (type, contact id) pairs, e.g. ("admin", "sh8013").
    pub contacts: Vec<(String, String)>,
    pub nameservers: Vec<String>,
    pub auth_info: String,
}

/// `<domain:update>` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainUpdate {
    pub name: String,
    pub add: UpdateAddRemove,
    pub rem: UpdateAddRemove,
    /// Contact (type, id) pairs to add / remove.
    pub add_contacts: Vec<(String, String)>,
    pub rem_contacts: Vec<(String, String)>,
    pub new_registrant: Option<String>,
    pub new_auth_info: Option<String>,
}

/// `<host:create>` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCreate {
    pub name: String,
    /// Textual IP addresses as they appeared on the wire.
    pub addresses: Vec<String>,
}

/// `<host:update>` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostUpdate {
    pub name: String,
    pub add: UpdateAddRemove,
    pub rem: UpdateAddRemove,
    /// `<host:chg><host:name>` — rename target.
    pub new_name: Option<String>,
}

/// `<contact:create>` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactCreate {
    pub id: String,
    pub postal_info: PostalInfo,
    pub voice: Option<String>,
    pub fax: Option<String>,
    pub email: String,
    pub auth_info: String,
}

/// `<contact:update>` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub id: String,
    pub add_statuses: Vec<StatusValue>,
    pub rem_statuses: Vec<StatusValue>,
    pub new_postal_info: Option<PostalInfo>,
    pub new_voice: Option<String>,
    pub new_fax: Option<String>,
    pub new_email: Option<String>,
    pub new_auth_info: Option<String>,
}

/// Postal address block for contacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalInfo {
    pub name: String,
    pub org: Option<String>,
    pub street: Vec<String>,
    pub city: String,
    pub state_or_province: Option<String>,
    pub postal_code: Option<String>,
    pub country_code: String,
}

/// A parsed resource command, one variant per implemented operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceCommand {
    DomainCheck {
        names: Vec<String>,
    },
    DomainInfo {
        name: String,
        auth_info: Option<String>,
    },
    DomainCreate(DomainCreate),
    DomainDelete {
        name: String,
    },
    DomainRenew {
        name: String,
        /// Current expiration date asserted by the client (yyyy-mm-dd).
        current_expiration_date: chrono::NaiveDate,
        period: Period,
    },
    DomainTransfer {
        op: TransferOp,
        name: String,
        period: Option<Period>,
        auth_info: Option<String>,
    },
    DomainUpdate(DomainUpdate),
    HostCheck {
        names: Vec<String>,
    },
    HostInfo {
        name: String,
    },
    HostCreate(HostCreate),
    HostDelete {
        name: String,
    },
    HostUpdate(HostUpdate),
    ContactCheck {
        ids: Vec<String>,
    },
    ContactInfo {
        id: String,
        auth_info: Option<String>,
    },
    ContactCreate(ContactCreate),
    ContactDelete {
        id: String,
    },
    ContactUpdate(ContactUpdate),
}

impl ResourceCommand {
    /// The object namespace this command targets.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::DomainCheck { .. }
            | Self::DomainInfo { .. }
            | Self::DomainCreate(_)
            | Self::DomainDelete { .. }
            | Self::DomainRenew { .. }
            | Self::DomainTransfer { .. }
            | Self::DomainUpdate(_) => ResourceKind::Domain,
            Self::HostCheck { .. }
            | Self::HostInfo { .. }
            | Self::HostCreate(_)
            | Self::HostDelete { .. }
            | Self::HostUpdate(_) => ResourceKind::Host,
            Self::ContactCheck { .. }
            | Self::ContactInfo { .. }
            | Self::ContactCreate(_)
            | Self::ContactDelete { .. }
            | Self::ContactUpdate(_) => ResourceKind::Contact,
        }
    }

    /// Short verb name for logging and history entries.
    #[must_use]
    pub const fn verb_name(&self) -> &'static str {
        match self {
            Self::DomainCheck { .. } | Self::HostCheck { .. } | Self::ContactCheck { .. } => {
                "check"
            }
            Self::DomainInfo { .. } | Self::HostInfo { .. } | Self::ContactInfo { .. } => "info",
            Self::DomainCreate(_) | Self::HostCreate(_) | Self::ContactCreate(_) => "create",
            Self::DomainDelete { .. } | Self::HostDelete { .. } | Self::ContactDelete { .. } => {
                "delete"
            }
            Self::DomainRenew { .. } => "renew",
            Self::DomainTransfer { .. } => "transfer",
            Self::DomainUpdate(_) | Self::HostUpdate(_) | Self::ContactUpdate(_) => "update",
        }
    }

    /// Whether this command mutates registry state.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::DomainCheck { .. }
                | Self::DomainInfo { .. }
                | Self::HostCheck { .. }
                | Self::HostInfo { .. }
                | Self::ContactCheck { .. }
                | Self::ContactInfo { .. }
                | Self::DomainTransfer {
                    op: TransferOp::Query,
                    ..
                }
        )
    }
}
