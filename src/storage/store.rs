use anyhow::{Context, Result};
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::protocol::DocumentId;

/// A document file found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub path: PathBuf,
}

/// Bytes of a stored document plus its last modification time.
#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub bytes: Vec<u8>,
    pub modified: SystemTime,
}

pub struct DocumentStore {
    root: PathBuf,
    file_name: Regex,
    seed_name: Regex,
}

impl DocumentStore {
    /// Opens the store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("creating document store {}", root.display()))?;

        Ok(Self {
            root,
            file_name: Regex::new(r"^rfc_(\d+)\.txt$")?,
            seed_name: Regex::new(r"(\d+)\.txt$")?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: DocumentId) -> PathBuf {
        self.root.join(format!("rfc_{}.txt", id))
    }

    /// Every document in the store, by identifier.
    pub async fn list(&self) -> Result<Vec<StoredDocument>> {
        let mut documents = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let id = self
                .file_name
                .captures(name)
                .and_then(|cap| cap.get(1))
                .and_then(|m| m.as_str().parse::<DocumentId>().ok());
            if let Some(id) = id {
                documents.push(StoredDocument {
                    id,
                    path: entry.path(),
                });
            }
        }

        documents.sort_by_key(|doc| doc.id);
        Ok(documents)
    }

    pub async fn contains(&self, id: DocumentId) -> bool {
        tokio::fs::try_exists(self.path_for(id))
            .await
            .unwrap_or(false)
    }

    /// Reads a document. `Ok(None)` if the store has no file for `id`.
    pub async fn read(&self, id: DocumentId) -> Result<Option<DocumentContent>> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let modified = tokio::fs::metadata(&path).await?.modified()?;

        Ok(Some(DocumentContent { bytes, modified }))
    }

    pub async fn save(&self, id: DocumentId, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(id);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    /// Title advertised for a document: its first non-blank line, or `RFC <n>`.
    pub async fn title_for(&self, id: DocumentId) -> String {
        let first_line = tokio::fs::read(self.path_for(id))
            .await
            .ok()
            .and_then(|bytes| {
                String::from_utf8_lossy(&bytes)
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(str::to_string)
            });
        first_line.unwrap_or_else(|| format!("RFC {}", id))
    }

    /// Copies an arbitrary file into the store as document `id`.
    pub async fn import(&self, id: DocumentId, source: &Path) -> Result<PathBuf> {
        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("reading {}", source.display()))?;
        self.save(id, &bytes).await
    }

    /// Copies every `*.txt` file of `dir` whose name ends in a number into the
    /// store. Returns how many files were imported.
    pub async fn seed_from(&self, dir: &Path) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("opening seed directory {}", dir.display()))?;
        let mut imported = 0;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let id = self
                .seed_name
                .captures(name)
                .and_then(|cap| cap.get(1))
                .and_then(|m| m.as_str().parse::<DocumentId>().ok());
            let Some(id) = id else {
                tracing::debug!("Skipping seed file {}", name);
                continue;
            };

            self.import(id, &entry.path()).await?;
            imported += 1;
        }

        Ok(imported)
    }
}
