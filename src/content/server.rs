use anyhow::Result;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::protocol::*;
use crate::storage::DocumentStore;

/// Formats a timestamp as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Operating system description sent in `OS` headers.
pub fn local_os() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

pub struct ContentServer {
    listener: TcpListener,
    store: Arc<DocumentStore>,
    os: String,
}

impl ContentServer {
    pub async fn bind(addr: impl ToSocketAddrs, store: Arc<DocumentStore>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            store,
            os: local_os(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, one task per connection.
    pub async fn run(self) -> Result<()> {
        tracing::info!("Upload server listening on {}", self.listener.local_addr()?);
        let os: Arc<str> = self.os.into();

        loop {
            let (stream, client) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!("Failed to accept peer connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            let store = self.store.clone();
            let os = os.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, &store, &os, client).await {
                    tracing::error!("Serving {} failed: {}", client, e);
                }
            });
        }
    }
}

async fn handle_connection<S>(
    mut stream: S,
    store: &DocumentStore,
    os: &str,
    client: SocketAddr,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(raw) = read_frame(&mut stream).await? else {
        return Ok(());
    };
    tracing::info!(
        "P2P request from {}\n{}",
        client,
        String::from_utf8_lossy(&raw).replace("\r\n", "\n")
    );

    let response = respond(store, os, &raw).await?;
    tracing::debug!(
        "P2P response to {}: {} ({} bytes)",
        client,
        response.status_line(),
        response.body.len()
    );

    stream.write_all(&encode_response(&response)).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Builds the response to one raw fetch request.
///
/// Only an I/O failure of the store (other than a missing file) is an `Err`.
pub async fn respond(store: &DocumentStore, os: &str, raw: &[u8]) -> Result<Response> {
    let request = match decode_request(raw).and_then(|request| FetchRequest::from_request(&request))
    {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected fetch request: {}", e);
            return Ok(error_response(e, os));
        }
    };

    let Some(content) = store.read(request.id).await? else {
        tracing::warn!("RFC {} not found for {}", request.id, request.host);
        return Ok(error_response(ProtocolError::ResourceNotFound(request.id), os));
    };

    tracing::info!(
        "Serving RFC {} ({} bytes) to {}",
        request.id,
        content.bytes.len(),
        request.host
    );

    Ok(Response::new(Status::Ok)
        .header(HEADER_DATE, http_date(SystemTime::now()))
        .header(HEADER_OS, os)
        .header(HEADER_LAST_MODIFIED, http_date(content.modified))
        .header(HEADER_CONTENT_LENGTH, content.bytes.len().to_string())
        .header(HEADER_CONTENT_TYPE, CONTENT_TYPE_TEXT)
        .with_body(content.bytes))
}

fn error_response(error: ProtocolError, os: &str) -> Response {
    Response::new(error.status())
        .header(HEADER_DATE, http_date(SystemTime::now()))
        .header(HEADER_OS, os)
        .header(HEADER_CONTENT_LENGTH, "0")
        .header(HEADER_CONTENT_TYPE, CONTENT_TYPE_TEXT)
}
