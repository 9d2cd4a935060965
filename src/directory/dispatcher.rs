use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::protocol::{
    DirectoryRequest, Response, Status, decode_request, encode_response, read_frame,
};
use crate::registry::{DocumentRecord, Index, IndexRegistry, format_records};

pub struct DirectoryServer {
    listener: TcpListener,
    registry: Arc<IndexRegistry>,
}

impl DirectoryServer {
    pub async fn bind(addr: impl ToSocketAddrs, registry: Arc<IndexRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<IndexRegistry> {
        self.registry.clone()
    }

    /// Accepts connections forever, one task per connection.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            "P2P-CI directory listening on {}",
            self.listener.local_addr()?
        );

        loop {
            let (stream, client) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            let registry = self.registry.clone();
            tokio::spawn(async move {
                tracing::debug!("Accepted connection from {}", client);
                if let Err(e) = handle_connection(stream, registry.as_ref(), client).await {
                    tracing::error!("Connection from {} failed: {}", client, e);
                }
                tracing::debug!("Closed connection from {}", client);
            });
        }
    }
}

/// Serves the single request of one connection.
async fn handle_connection<S, I>(mut stream: S, index: &I, client: SocketAddr) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    I: Index + ?Sized,
{
    let Some(raw) = read_frame(&mut stream).await? else {
        tracing::debug!("{} closed the connection without a request", client);
        return Ok(());
    };
    tracing::debug!(
        "Request from {}\n{}",
        client,
        String::from_utf8_lossy(&raw).replace("\r\n", "\n")
    );

    let response = dispatch(index, &raw)?;
    tracing::debug!("Response to {}: {}", client, response.status_line());

    stream.write_all(&encode_response(&response)).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Decodes, validates and executes one raw request against `index`.
///
/// Protocol errors are turned into their status response. Only a failing
/// index backend produces `Err`.
pub fn dispatch<I: Index + ?Sized>(index: &I, raw: &[u8]) -> Result<Response> {
    let request =
        match decode_request(raw).and_then(|request| DirectoryRequest::from_request(&request)) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Rejected directory request: {}", e);
                return Ok(Response::new(e.status()));
            }
        };

    execute(index, request)
}

pub fn execute<I: Index + ?Sized>(index: &I, request: DirectoryRequest) -> Result<Response> {
    let from = request.peer().to_string();

    let body = match request {
        DirectoryRequest::Add { id, title, peer } => {
            let confirmation = index.add(DocumentRecord::new(id, title, peer))?;
            tracing::info!("Registered RFC {} for {}", id, from);
            confirmation
        }
        DirectoryRequest::Lookup { id, .. } => {
            let records = index.lookup(id)?;
            tracing::info!(
                "LOOKUP RFC {} from {} -> {} record(s)",
                id,
                from,
                records.len()
            );
            format_records(&records)
        }
        DirectoryRequest::ListAll { .. } => {
            let records = index.list_all()?;
            tracing::info!("LIST ALL from {} -> {} record(s)", from, records.len());
            format_records(&records)
        }
    };

    Ok(Response::new(Status::Ok).with_body(body))
}
