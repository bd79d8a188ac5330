//! Wire-layer error type.

use thiserror::Error;

use crate::result_code::ResultCode;

/// Errors produced while decoding an inbound EPP document.
///
/// Every variant maps to a single EPP result code via [`ProtoError::code`];
/// the session layer turns these into negative responses rather than
/// dropping the connection.
#[derive(Error, Debug)]
pub enum ProtoError {
    /// The document is not well-formed XML.
    #[error("XML syntax error: {0}")]
    Syntax(String),

    /// A required element is absent.
    #[error("Missing required element: <{0}>")]
    MissingElement(String),

    /// An attribute is absent or carries an unusable value.
    #[error("Bad attribute {attribute} on <{element}>: {detail}")]
    BadAttribute {
        element: String,
        attribute: String,
        detail: String,
    },

    /// The command verb is not one this server implements.
    #[error("Unknown or unsupported command: {0}")]
    UnsupportedCommand(String),

    /// The object namespace is not one this server serves.
    #[error("Unknown or unsupported object type: {0}")]
    UnsupportedObject(String),
}

impl ProtoError {
    /// The EPP result code reported for this decode failure.
    #[must_use]
    pub const fn code(&self) -> ResultCode {
        match self {
            Self::Syntax(_) => ResultCode::CommandSyntaxError,
            Self::MissingElement(_) => ResultCode::RequiredParameterMissing,
            Self::BadAttribute { .. } => ResultCode::ParameterValueSyntaxError,
            Self::UnsupportedCommand(_) => ResultCode::UnknownCommand,
            Self::UnsupportedObject(_) => ResultCode::UnknownCommand,
        }
    }
}

/// Wire-layer result alias.
pub type ProtoResult<T> = Result<T, ProtoError>;
