//! EPP result codes per RFC 5730 section 3.

use serde::{Deserialize, Serialize};

/// An EPP result code.
///
/// Codes in the 1xxx range indicate success; 2xxx codes indicate failure.
/// The numeric values and canonical English messages are fixed by RFC 5730
/// and must never change: registrar client software matches on both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    /// 1000
    Success,
    /// 1001
    SuccessWithActionPending,
    /// 1300
    SuccessWithNoMessages,
    /// 1301
    SuccessWithAckMessage,
    /// 1500
    SuccessAndClose,
    /// 2000
    UnknownCommand,
    /// 2001
    CommandSyntaxError,
    /// 2002
    CommandUseError,
    /// 2003
    RequiredParameterMissing,
    /// 2004
    ParameterValueRangeError,
    /// 2005
    ParameterValueSyntaxError,
    /// 2201
    AuthorizationError,
    /// 2202
    InvalidAuthorizationInformation,
    /// 2300
    ObjectPendingTransfer,
    /// 2301
    ObjectNotPendingTransfer,
    /// 2302
    ObjectExists,
    /// 2303
    ObjectDoesNotExist,
    /// 2304
    StatusProhibitsOperation,
    /// 2305
    AssociationProhibitsOperation,
    /// 2306
    ParameterValuePolicyError,
    /// 2308
    DataManagementPolicyViolation,
    /// 2400
    CommandFailed,
    /// 2501
    AuthenticationErrorClosingConnection,
    /// 2502
    SessionLimitExceededClosingConnection,
}

impl ResultCode {
    /// The numeric wire value.
    #[must_use]
    pub const fn value(self) -> u16 {
        match self {
            Self::Success => 1000,
            Self::SuccessWithActionPending => 1001,
            Self::SuccessWithNoMessages => 1300,
            Self::SuccessWithAckMessage => 1301,
            Self::SuccessAndClose => 1500,
            Self::UnknownCommand => 2000,
            Self::CommandSyntaxError => 2001,
            Self::CommandUseError => 2002,
            Self::RequiredParameterMissing => 2003,
            Self::ParameterValueRangeError => 2004,
            Self::ParameterValueSyntaxError => 2005,
            Self::AuthorizationError => 2201,
            Self::InvalidAuthorizationInformation => 2202,
            Self::ObjectPendingTransfer => 2300,
            Self::ObjectNotPendingTransfer => 2301,
            Self::ObjectExists => 2302,
            Self::ObjectDoesNotExist => 2303,
            Self::StatusProhibitsOperation => 2304,
            Self::AssociationProhibitsOperation => 2305,
            Self::ParameterValuePolicyError => 2306,
            Self::DataManagementPolicyViolation => 2308,
            Self::CommandFailed => 2400,
            Self::AuthenticationErrorClosingConnection => 2501,
            Self::SessionLimitExceededClosingConnection => 2502,
        }
    }

    /// The canonical message text from RFC 5730.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Success => "Command completed successfully",
            Self::SuccessWithActionPending => "Command completed successfully; action pending",
            Self::SuccessWithNoMessages => "Command completed successfully; no messages",
            Self::SuccessWithAckMessage => "Command completed successfully; ack to dequeue",
            Self::SuccessAndClose => "Command completed successfully; ending session",
            Self::UnknownCommand => "Unknown command",
            Self::CommandSyntaxError => "Command syntax error",
            Self::CommandUseError => "Command use error",
            Self::RequiredParameterMissing => "Required parameter missing",
            Self::ParameterValueRangeError => "Parameter value range error",
            Self::ParameterValueSyntaxError => "Parameter value syntax error",
            Self::AuthorizationError => "Authorization error",
            Self::InvalidAuthorizationInformation => "Invalid authorization information",
            Self::ObjectPendingTransfer => "Object pending transfer",
            Self::ObjectNotPendingTransfer => "Object not pending transfer",
            Self::ObjectExists => "Object exists",
            Self::ObjectDoesNotExist => "Object does not exist",
            Self::StatusProhibitsOperation => "Object status prohibits operation",
            Self::AssociationProhibitsOperation => "Object association prohibits operation",
            Self::ParameterValuePolicyError => "Parameter value policy error",
            Self::DataManagementPolicyViolation => "Data management policy violation",
            Self::CommandFailed => "Command failed",
            Self::AuthenticationErrorClosingConnection => {
                "Authentication error; server closing connection"
            }
            Self::SessionLimitExceededClosingConnection => {
                "Session limit exceeded; server closing connection"
            }
        }
    }

    /// Whether this code reports success (1xxx range).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.value() < 2000
    }

    /// Whether this code requires the server to close the session afterwards.
    #[must_use]
    pub const fn closes_connection(self) -> bool {
        matches!(
            self,
            Self::SuccessAndClose
                | Self::AuthenticationErrorClosingConnection
                | Self::SessionLimitExceededClosingConnection
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_codes_are_below_2000() {
        assert!(ResultCode::Success.is_success());
        assert!(ResultCode::SuccessWithActionPending.is_success());
        assert!(!ResultCode::ObjectDoesNotExist.is_success());
        assert!(!ResultCode::CommandFailed.is_success());
    }

    #[test]
    fn wire_values_match_rfc() {
        assert_eq!(ResultCode::Success.value(), 1000);
        assert_eq!(ResultCode::SuccessWithActionPending.value(), 1001);
        assert_eq!(ResultCode::AuthorizationError.value(), 2201);
        assert_eq!(ResultCode::ObjectExists.value(), 2302);
        assert_eq!(ResultCode::ObjectDoesNotExist.value(), 2303);
        assert_eq!(ResultCode::StatusProhibitsOperation.value(), 2304);
    }

    #[test]
    fn closing_codes() {
        assert!(ResultCode::SuccessAndClose.closes_connection());
        assert!(!ResultCode::Success.closes_connection());
    }
}
