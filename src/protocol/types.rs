use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ProtocolError;

// --- Protocol Constants ---

/// The only protocol version this implementation speaks.
pub const PROTOCOL_VERSION: &str = "P2P-CI/1.0";
/// Canonical line terminator.
pub const CRLF: &str = "\r\n";
/// Separates the message head from the body.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

pub const HEADER_HOST: &str = "Host";
pub const HEADER_PORT: &str = "Port";
pub const HEADER_TITLE: &str = "Title";
pub const HEADER_OS: &str = "OS";
pub const HEADER_DATE: &str = "Date";
pub const HEADER_LAST_MODIFIED: &str = "Last-Modified";
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";

/// Content type of every served document.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// Numeric identifier of a document (an RFC number). Always positive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DocumentId(pub u32);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(DocumentId(n)),
            _ => Err(ProtocolError::InvalidNumericField {
                field: "RFC",
                value: s.to_string(),
            }),
        }
    }
}

/// Request method token.
///
/// Unknown tokens are kept as `Other` so that the version check can run before
/// the method is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Add,
    Lookup,
    List,
    Get,
    Other(String),
}

impl Method {
    pub fn from_token(token: &str) -> Self {
        match token {
            "ADD" => Method::Add,
            "LOOKUP" => Method::Lookup,
            "LIST" => Method::List,
            "GET" => Method::Get,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Add => "ADD",
            Method::Lookup => "LOOKUP",
            Method::List => "LIST",
            Method::Get => "GET",
            Method::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource part of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// `RFC <n>`
    Rfc(DocumentId),
    /// `ALL`
    All,
    /// Any other resource text, kept so the version can be checked first.
    Other(String),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Rfc(id) => write!(f, "RFC {}", id),
            Resource::All => f.write_str("ALL"),
            Resource::Other(raw) => f.write_str(raw),
        }
    }
}

/// Ordered header collection.
///
/// Insertion order is kept. Inserting an existing name replaces its value but
/// keeps the slot of the first occurrence. Names are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// A decoded (or to-be-encoded) request message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub resource: Resource,
    pub version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    /// Creates a request stamped with [`PROTOCOL_VERSION`].
    pub fn new(method: Method, resource: Resource) -> Self {
        Self {
            method,
            resource,
            version: PROTOCOL_VERSION.to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Status codes this protocol defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    VersionNotSupported,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::VersionNotSupported => 505,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::NotFound => "Not Found",
            Status::VersionNotSupported => "P2P-CI Version Not Supported",
        }
    }
}

/// A decoded (or to-be-encoded) response message.
///
/// `code` and `reason` are kept raw so responses from other implementations
/// with codes outside [`Status`] still decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub version: String,
    pub code: u16,
    pub reason: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: Status) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            code: status.code(),
            reason: status.reason().to_string(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code == Status::Ok.code()
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn status_line(&self) -> String {
        format!("{} {} {}", self.version, self.code, self.reason)
    }
}
