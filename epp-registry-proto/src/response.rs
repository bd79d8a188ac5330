//! Typed model of outbound EPP responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result_code::ResultCode;
use crate::status::StatusValue;

/// Transaction id pair echoed on every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrId {
    /// Client transaction id, echoed back verbatim when present.
    pub cl_trid: Option<String>,
    /// Server transaction id, unique per processed command.
    pub sv_trid: String,
}

/// An EPP `<response>` document.
///
/// `message` carries the human-readable text for the result. For successes it
/// is the canonical RFC text; for failures it is the specific, contractually
/// stable message of the error that aborted the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EppResponse {
    pub code: ResultCode,
    pub message: String,
    pub res_data: Option<ResData>,
    pub tr_id: TrId,
}

impl EppResponse {
    /// A plain success (1000) response without result data.
    #[must_use]
    pub fn success(tr_id: TrId) -> Self {
        Self::with_code(ResultCode::Success, tr_id)
    }

    /// A response with the canonical message for `code`.
    #[must_use]
    pub fn with_code(code: ResultCode, tr_id: TrId) -> Self {
        Self {
            code,
            message: code.message().to_string(),
            res_data: None,
            tr_id,
        }
    }

    /// A failure response carrying a specific message.
    #[must_use]
    pub fn failure(code: ResultCode, message: impl Into<String>, tr_id: TrId) -> Self {
        Self {
            code,
            message: message.into(),
            res_data: None,
            tr_id,
        }
    }

    /// Attaches a result data block.
    #[must_use]
    pub fn with_res_data(mut self, res_data: ResData) -> Self {
        self.res_data = Some(res_data);
        self
    }
}

/// One entry of a check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckItem {
    pub id: String,
    pub available: bool,
    /// Unavailability reason; `None` when available.
    pub reason: Option<String>,
}

impl CheckItem {
    #[must_use]
    pub fn available(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            available: true,
            reason: None,
        }
    }

    #[must_use]
    pub fn taken(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            available: false,
            reason: Some("In use".to_string()),
        }
    }
}

/// Domain `<domain:infData>` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainInfoData {
    pub name: String,
    pub repo_id: String,
    pub statuses: Vec<StatusValue>,
    pub registrant: String,
    pub contacts: Vec<(String, String)>,
    pub nameservers: Vec<String>,
    pub subordinate_hosts: Vec<String>,
    pub sponsor_registrar: String,
    pub creation_registrar: String,
    pub creation_time: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_transfer_time: Option<DateTime<Utc>>,
    /// Shown only to the sponsoring registrar or with valid auth info.
    pub auth_info: Option<String>,
}

/// Host `<host:infData>` view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostInfoData {
    pub name: String,
    pub repo_id: String,
    pub statuses: Vec<StatusValue>,
    pub addresses: Vec<String>,
    pub sponsor_registrar: String,
    pub creation_registrar: String,
    pub creation_time: DateTime<Utc>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_transfer_time: Option<DateTime<Utc>>,
}

/// Contact `<contact:infData>` view (postal details elided to the fields the
/// registry stores).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactInfoData {
    pub id: String,
    pub repo_id: String,
    pub statuses: Vec<StatusValue>,
    pub name: String,
    pub email: String,
    pub sponsor_registrar: String,
    pub creation_registrar: String,
    pub creation_time: DateTime<Utc>,
    pub last_update_time: Option<DateTime<Utc>>,
    pub last_transfer_time: Option<DateTime<Utc>>,
}

/// Transfer query/request view (`<domain:trnData>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferView {
    pub name: String,
    /// Wire-format transfer status, e.g. "pending" or "serverApproved".
    pub status: String,
    pub gaining_registrar: String,
    pub request_time: DateTime<Utc>,
    pub losing_registrar: String,
    /// Time the transfer resolves (or resolved).
    pub action_time: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
}

/// Result data payloads, one per response-bearing command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResData {
    DomainCheck(Vec<CheckItem>),
    HostCheck(Vec<CheckItem>),
    ContactCheck(Vec<CheckItem>),
    DomainCreate {
        name: String,
        creation_time: DateTime<Utc>,
        expiration_time: DateTime<Utc>,
    },
    HostCreate {
        name: String,
        creation_time: DateTime<Utc>,
    },
    ContactCreate {
        id: String,
        creation_time: DateTime<Utc>,
    },
    DomainRenew {
        name: String,
        expiration_time: DateTime<Utc>,
    },
    DomainInfo(Box<DomainInfoData>),
    HostInfo(Box<HostInfoData>),
    ContactInfo(Box<ContactInfoData>),
    DomainTransfer(TransferView),
}
