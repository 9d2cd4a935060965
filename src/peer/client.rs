//! Client side of the protocol: directory requests and peer fetches.

use std::fmt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::content::local_os;
use crate::directory;
use crate::protocol::*;
use crate::registry::{DocumentRecord, FileIndex};

/// Failures a peer can observe while talking to the directory or another peer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection to {addr} failed: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid response: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{code} {reason}")]
    Status { code: u16, reason: String },

    #[error("content length mismatch: expected {expected} bytes, received {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("offline index failure: {0:#}")]
    Index(anyhow::Error),
}

impl ClientError {
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Connection { .. })
    }
}

/// A directory answer plus the records parsed from its body.
#[derive(Debug, Clone)]
pub struct DirectoryReply {
    pub response: Response,
    pub records: Vec<DocumentRecord>,
    pub raw: Vec<u8>,
}

impl DirectoryReply {
    fn from_raw(raw: Vec<u8>) -> Result<Self, ClientError> {
        let response = decode_response(&raw)?;
        let records = response
            .body_text()
            .lines()
            .filter_map(DocumentRecord::parse_line)
            .collect();
        Ok(Self {
            response,
            records,
            raw,
        })
    }

    /// Turns any non-200 answer into [`ClientError::Status`].
    pub fn ok(self) -> Result<Self, ClientError> {
        if self.response.is_ok() {
            Ok(self)
        } else {
            Err(ClientError::Status {
                code: self.response.code,
                reason: self.response.reason,
            })
        }
    }

    /// The whole answer as text, as it came off the wire.
    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Remote { host: String, port: u16 },
    Offline(FileIndex),
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Remote { host, port } => write!(f, "{}:{}", host, port),
            Backend::Offline(index) => write!(f, "offline index {}", index.path().display()),
        }
    }
}

/// Talks to the directory on behalf of one advertised peer.
///
/// In offline mode requests are encoded exactly as for the network and answered
/// by the directory dispatcher running over a shared [`FileIndex`].
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    local: PeerAddress,
    backend: Backend,
}

impl DirectoryClient {
    pub fn remote(host: impl Into<String>, port: u16, local: PeerAddress) -> Self {
        Self {
            local,
            backend: Backend::Remote {
                host: host.into(),
                port,
            },
        }
    }

    pub fn offline(index: FileIndex, local: PeerAddress) -> Self {
        Self {
            local,
            backend: Backend::Offline(index),
        }
    }

    pub fn local(&self) -> &PeerAddress {
        &self.local
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.backend, Backend::Offline(_))
    }

    pub async fn add(&self, id: DocumentId, title: &str) -> Result<DirectoryReply, ClientError> {
        self.send(DirectoryRequest::Add {
            id,
            title: title.to_string(),
            peer: self.local.clone(),
        })
        .await
    }

    pub async fn lookup(&self, id: DocumentId) -> Result<DirectoryReply, ClientError> {
        self.send(DirectoryRequest::Lookup {
            id,
            peer: self.local.clone(),
        })
        .await
    }

    pub async fn list_all(&self) -> Result<DirectoryReply, ClientError> {
        self.send(DirectoryRequest::ListAll {
            peer: self.local.clone(),
        })
        .await
    }

    async fn send(&self, request: DirectoryRequest) -> Result<DirectoryReply, ClientError> {
        let payload = encode_request(&request.into_request());
        tracing::debug!(
            "Sending to {}\n{}",
            self.backend,
            String::from_utf8_lossy(&payload).replace("\r\n", "\n")
        );

        let raw = match &self.backend {
            Backend::Remote { host, port } => exchange(host, *port, &payload).await?,
            Backend::Offline(index) => {
                let index = index.clone();
                let response = tokio::task::spawn_blocking(move || {
                    directory::dispatch(&index, &payload)
                })
                .await
                .map_err(|e| ClientError::Index(e.into()))?
                .map_err(ClientError::Index)?;
                encode_response(&response)
            }
        };

        tracing::debug!(
            "Received from {}\n{}",
            self.backend,
            String::from_utf8_lossy(&raw).replace("\r\n", "\n")
        );
        DirectoryReply::from_raw(raw)
    }
}

/// A document received from another peer.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub response: Response,
    pub raw: Vec<u8>,
}

impl FetchedDocument {
    pub fn bytes(&self) -> &[u8] {
        &self.response.body
    }

    /// Status line and headers, as received.
    pub fn head_text(&self) -> String {
        let head_len = self.raw.len() - self.response.body.len();
        String::from_utf8_lossy(&self.raw[..head_len]).into_owned()
    }
}

/// Fetches document `id` from the content server at `peer`.
///
/// Fails unless the peer answers `200` with a body of exactly the announced
/// `Content-Length`.
pub async fn fetch_document(
    peer: &PeerAddress,
    id: DocumentId,
) -> Result<FetchedDocument, ClientError> {
    let request = FetchRequest {
        id,
        host: peer.host.clone(),
        os: local_os(),
    }
    .into_request();

    tracing::info!("GET request -> {} (RFC {})", peer, id);
    let raw = exchange(&peer.host, peer.port, &encode_request(&request)).await?;
    let response = decode_response(&raw)?;
    tracing::info!("GET response <- {} [{}]", peer, response.status_line());

    if !response.is_ok() {
        return Err(ClientError::Status {
            code: response.code,
            reason: response.reason,
        });
    }

    if let Some(declared) = response.headers.get(HEADER_CONTENT_LENGTH) {
        let expected =
            declared
                .parse::<usize>()
                .map_err(|_| ProtocolError::InvalidNumericField {
                    field: HEADER_CONTENT_LENGTH,
                    value: declared.to_string(),
                })?;
        if expected != response.body.len() {
            return Err(ClientError::LengthMismatch {
                expected,
                actual: response.body.len(),
            });
        }
    }

    Ok(FetchedDocument { response, raw })
}

/// One request, one response: connect, send, read until the server closes.
async fn exchange(host: &str, port: u16, payload: &[u8]) -> Result<Vec<u8>, ClientError> {
    let connection_error = |source| ClientError::Connection {
        addr: format!("{}:{}", host, port),
        source,
    };

    let mut stream = TcpStream::connect((host, port))
        .await
        .map_err(connection_error)?;
    stream.write_all(payload).await.map_err(connection_error)?;

    let mut raw = Vec::new();
    stream
        .read_to_end(&mut raw)
        .await
        .map_err(connection_error)?;
    Ok(raw)
}
