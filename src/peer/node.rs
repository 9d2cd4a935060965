use anyhow::{Context, Result, bail};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::ToSocketAddrs;
use tokio::task::JoinHandle;

use crate::content::ContentServer;
use crate::peer::client::{ClientError, DirectoryClient, DirectoryReply, FetchedDocument, fetch_document};
use crate::protocol::{DocumentId, PeerAddress};
use crate::registry::DocumentRecord;
use crate::storage::{DocumentStore, StoredDocument};

/// Outcome of registering every local document at startup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub registered: usize,
    pub rejected: usize,
}

/// A document fetched from a peer, saved locally and announced to the directory.
#[derive(Debug)]
pub struct Download {
    pub source: PeerAddress,
    pub path: PathBuf,
    pub fetched: FetchedDocument,
    pub registration: DirectoryReply,
}

#[derive(Debug)]
pub enum DownloadOutcome {
    /// The document was already in the local store; nothing was fetched.
    AlreadyLocal(PathBuf),
    Downloaded(Box<Download>),
}

/// One participating peer: a local store, a content server and a directory client.
pub struct PeerNode {
    directory: DirectoryClient,
    store: Arc<DocumentStore>,
}

impl PeerNode {
    pub fn new(directory: DirectoryClient, store: Arc<DocumentStore>) -> Self {
        Self { directory, store }
    }

    pub fn local(&self) -> &PeerAddress {
        self.directory.local()
    }

    pub fn directory(&self) -> &DirectoryClient {
        &self.directory
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Binds the content server and spawns its accept loop.
    pub async fn serve_content(
        &self,
        addr: impl ToSocketAddrs,
    ) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
        let server = ContentServer::bind(addr, self.store.clone()).await?;
        let bound = server.local_addr()?;
        Ok((bound, tokio::spawn(server.run())))
    }

    /// Registers every document of the local store with the directory.
    ///
    /// A rejected registration is logged and skipped. Losing the directory
    /// connection aborts the sync.
    pub async fn sync_local(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();

        for StoredDocument { id, .. } in self.store.list().await? {
            let title = self.store.title_for(id).await;
            let reply = self.directory.add(id, &title).await?;
            if reply.response.is_ok() {
                tracing::info!("Registered RFC {} '{}'", id, title);
                report.registered += 1;
            } else {
                tracing::warn!(
                    "Directory rejected RFC {}: {}",
                    id,
                    reply.response.status_line()
                );
                report.rejected += 1;
            }
        }

        Ok(report)
    }

    /// Copies `source` into the store as document `id` and registers it.
    pub async fn add_local(&self, id: DocumentId, source: &Path, title: &str) -> Result<DirectoryReply> {
        let path = self.store.import(id, source).await?;
        tracing::info!("Stored RFC {} at {}", id, path.display());
        Ok(self.directory.add(id, title).await?.ok()?)
    }

    pub async fn lookup(&self, id: DocumentId) -> Result<DirectoryReply> {
        Ok(self.directory.lookup(id).await?.ok()?)
    }

    pub async fn list(&self) -> Result<DirectoryReply> {
        Ok(self.directory.list_all().await?.ok()?)
    }

    /// Fetches document `id` from `source`, stores it and announces this peer as
    /// a new holder. `title` defaults to the document's first non-blank line.
    ///
    /// A directory refusal of the announcement is logged; the download itself
    /// still counts as done.
    pub async fn download(
        &self,
        id: DocumentId,
        source: &PeerAddress,
        title: Option<&str>,
    ) -> Result<Download> {
        let fetched = fetch_document(source, id).await?;
        let path = self.store.save(id, fetched.bytes()).await?;
        tracing::info!(
            "Downloaded RFC {} from {} ({} bytes) to {}",
            id,
            source,
            fetched.bytes().len(),
            path.display()
        );

        let title = match title {
            Some(title) => title.to_string(),
            None => self.store.title_for(id).await,
        };
        let registration = self.directory.add(id, &title).await?;
        if !registration.response.is_ok() {
            tracing::warn!(
                "Directory refused registration of RFC {}: {}",
                id,
                registration.response.status_line()
            );
        }

        Ok(Download {
            source: source.clone(),
            path,
            fetched,
            registration,
        })
    }

    /// Tries each holder in turn until one supplies the document.
    ///
    /// Holders that are this peer are skipped when the document is already
    /// stored locally. Fails only when every holder failed.
    pub async fn download_from_peers(
        &self,
        id: DocumentId,
        holders: &[DocumentRecord],
    ) -> Result<DownloadOutcome> {
        let have_local = self.store.contains(id).await;
        let mut last_error: Option<anyhow::Error> = None;

        for holder in holders.iter().filter(|record| record.id == id) {
            let peer = holder.peer();
            if peer == *self.local() {
                if have_local {
                    return Ok(DownloadOutcome::AlreadyLocal(self.store.path_for(id)));
                }
                continue;
            }

            match self.download(id, &peer, Some(&holder.title)).await {
                Ok(download) => return Ok(DownloadOutcome::Downloaded(Box::new(download))),
                Err(e) => {
                    tracing::warn!("Fetching RFC {} from {} failed: {:#}", id, peer, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e.context(format!("no peer could supply RFC {}", id))),
            None if have_local => Ok(DownloadOutcome::AlreadyLocal(self.store.path_for(id))),
            None => bail!("no peer holds RFC {}", id),
        }
    }

    /// Imports every numbered `*.txt` file of `dir` and registers the store.
    pub async fn seed(&self, dir: &Path) -> Result<(usize, SyncReport)> {
        let imported = self
            .store
            .seed_from(dir)
            .await
            .with_context(|| format!("seeding from {}", dir.display()))?;
        tracing::info!("Imported {} document(s) from {}", imported, dir.display());
        let report = self.sync_local().await?;
        Ok((imported, report))
    }

    pub async fn local_documents(&self) -> Result<Vec<StoredDocument>> {
        self.store.list().await
    }
}

/// True when `error` was caused by an unreachable peer or directory.
pub fn is_connection_failure(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ClientError>()
        .is_some_and(ClientError::is_connection)
}
