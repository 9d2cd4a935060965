use super::types::{DocumentId, Status};

/// Everything that can be wrong with a message, from framing to semantics.
///
/// Servers never propagate these past the connection: each variant maps onto a
/// status code via [`ProtocolError::status`] and is answered on the same
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("message is missing the blank line that ends its head")]
    IncompleteMessage,

    #[error("message head is not valid UTF-8")]
    InvalidEncoding,

    #[error("malformed start line: {0:?}")]
    MalformedStartLine(String),

    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    #[error("unsupported protocol version {0:?}")]
    UnsupportedVersion(String),

    #[error("missing required header {0}")]
    MissingHeader(&'static str),

    #[error("invalid numeric value for {field}: {value:?}")]
    InvalidNumericField { field: &'static str, value: String },

    #[error("unknown method {0:?}")]
    UnknownMethod(String),

    #[error("RFC {0} not found")]
    ResourceNotFound(DocumentId),
}

impl ProtocolError {
    pub fn status(&self) -> Status {
        match self {
            ProtocolError::UnsupportedVersion(_) => Status::VersionNotSupported,
            ProtocolError::ResourceNotFound(_) => Status::NotFound,
            _ => Status::BadRequest,
        }
    }
}
