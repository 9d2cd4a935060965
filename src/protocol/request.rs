//! Typed, validated requests.
//!
//! A decoded [`Request`] is only syntactically valid. The constructors here apply
//! the semantic checks in a fixed order: protocol version, method, resource,
//! required headers, numeric header values.

use std::fmt;

use super::error::ProtocolError;
use super::types::*;

/// Advertised upload endpoint of a peer (`Host` + `Port` headers).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn from_headers(headers: &Headers) -> Result<Self, ProtocolError> {
        let host = required(headers, HEADER_HOST)?;
        let port = required(headers, HEADER_PORT)?;
        let port = match port.parse::<u16>() {
            Ok(p) if p > 0 => p,
            _ => {
                return Err(ProtocolError::InvalidNumericField {
                    field: HEADER_PORT,
                    value: port.to_string(),
                });
            }
        };
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Requests served by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryRequest {
    /// `ADD RFC <n>` with `Host`, `Port`, `Title`.
    Add {
        id: DocumentId,
        title: String,
        peer: PeerAddress,
    },
    /// `LOOKUP RFC <n>` with `Host`, `Port`.
    Lookup { id: DocumentId, peer: PeerAddress },
    /// `LIST ALL` with `Host`, `Port`.
    ListAll { peer: PeerAddress },
}

impl DirectoryRequest {
    pub fn from_request(request: &Request) -> Result<Self, ProtocolError> {
        check_version(request)?;

        match &request.method {
            Method::Add => {
                let id = document_id(request)?;
                let peer = PeerAddress::from_headers(&request.headers)?;
                let title = required(&request.headers, HEADER_TITLE)?;
                Ok(DirectoryRequest::Add {
                    id,
                    title: title.to_string(),
                    peer,
                })
            }
            Method::Lookup => {
                let id = document_id(request)?;
                Ok(DirectoryRequest::Lookup {
                    id,
                    peer: PeerAddress::from_headers(&request.headers)?,
                })
            }
            Method::List => match request.resource {
                Resource::All => Ok(DirectoryRequest::ListAll {
                    peer: PeerAddress::from_headers(&request.headers)?,
                }),
                _ => Err(malformed_start_line(request)),
            },
            method => Err(ProtocolError::UnknownMethod(method.to_string())),
        }
    }

    /// The peer that sent the request.
    pub fn peer(&self) -> &PeerAddress {
        match self {
            DirectoryRequest::Add { peer, .. }
            | DirectoryRequest::Lookup { peer, .. }
            | DirectoryRequest::ListAll { peer } => peer,
        }
    }

    pub fn into_request(self) -> Request {
        match self {
            DirectoryRequest::Add { id, title, peer } => {
                Request::new(Method::Add, Resource::Rfc(id))
                    .header(HEADER_HOST, peer.host)
                    .header(HEADER_PORT, peer.port.to_string())
                    .header(HEADER_TITLE, title)
            }
            DirectoryRequest::Lookup { id, peer } => Request::new(Method::Lookup, Resource::Rfc(id))
                .header(HEADER_HOST, peer.host)
                .header(HEADER_PORT, peer.port.to_string()),
            DirectoryRequest::ListAll { peer } => Request::new(Method::List, Resource::All)
                .header(HEADER_HOST, peer.host)
                .header(HEADER_PORT, peer.port.to_string()),
        }
    }
}

/// `GET RFC <n>` sent to a peer's content server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: DocumentId,
    pub host: String,
    pub os: String,
}

impl FetchRequest {
    pub fn from_request(request: &Request) -> Result<Self, ProtocolError> {
        check_version(request)?;

        if request.method != Method::Get {
            return Err(ProtocolError::UnknownMethod(request.method.to_string()));
        }
        let id = document_id(request)?;

        let host = required(&request.headers, HEADER_HOST)?;
        let os = required(&request.headers, HEADER_OS)?;

        Ok(FetchRequest {
            id,
            host: host.to_string(),
            os: os.to_string(),
        })
    }

    pub fn into_request(self) -> Request {
        Request::new(Method::Get, Resource::Rfc(self.id))
            .header(HEADER_HOST, self.host)
            .header(HEADER_OS, self.os)
    }
}

fn check_version(request: &Request) -> Result<(), ProtocolError> {
    if request.version == PROTOCOL_VERSION {
        Ok(())
    } else {
        Err(ProtocolError::UnsupportedVersion(request.version.clone()))
    }
}

/// The `RFC <n>` resource of a request whose version is already checked.
fn document_id(request: &Request) -> Result<DocumentId, ProtocolError> {
    match &request.resource {
        Resource::Rfc(id) => Ok(*id),
        Resource::Other(raw) => match raw.split_whitespace().collect::<Vec<_>>()[..] {
            ["RFC", number] => number.parse(),
            _ => Err(malformed_start_line(request)),
        },
        Resource::All => Err(malformed_start_line(request)),
    }
}

fn malformed_start_line(request: &Request) -> ProtocolError {
    ProtocolError::MalformedStartLine(format!(
        "{} {} {}",
        request.method, request.resource, request.version
    ))
}

/// A header that must be present with a non-blank value.
fn required<'a>(headers: &'a Headers, name: &'static str) -> Result<&'a str, ProtocolError> {
    match headers.get(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ProtocolError::MissingHeader(name)),
    }
}
