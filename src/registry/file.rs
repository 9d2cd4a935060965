//! File-backed index for running peers without a directory server.
//!
//! Several peer processes on one machine point at the same JSON file. Each
//! operation opens the file, takes an advisory lock (exclusive for writes,
//! shared for reads) and holds it until the operation is complete.

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::Index;
use super::types::DocumentRecord;
use crate::protocol::DocumentId;

/// On-disk layout. Records are stored in registration order.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    records: Vec<DocumentRecord>,
}

#[derive(Debug, Clone)]
pub struct FileIndex {
    path: PathBuf,
}

impl FileIndex {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_file(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("opening offline index {}", self.path.display()))
    }

    fn load(&self, file: &mut File) -> Result<IndexFile> {
        let mut contents = String::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(IndexFile::default());
        }
        match serde_json::from_str(&contents) {
            Ok(index) => Ok(index),
            Err(e) => {
                tracing::warn!(
                    "Offline index {} is corrupted ({}); starting fresh",
                    self.path.display(),
                    e
                );
                Ok(IndexFile::default())
            }
        }
    }

    fn store(&self, file: &mut File, index: &IndexFile) -> Result<()> {
        let encoded = serde_json::to_vec_pretty(index)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&encoded)?;
        file.sync_data()?;
        Ok(())
    }

    /// Releases the advisory lock. Closing the file releases it as well, so a
    /// failure here is only logged.
    fn unlock(&self, file: &File) {
        if let Err(e) = FileExt::unlock(file) {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }

    fn read_locked<T>(&self, f: impl FnOnce(IndexFile) -> T) -> Result<T> {
        let mut file = self.open_file()?;
        FileExt::lock_shared(&file)
            .with_context(|| format!("locking {}", self.path.display()))?;
        let result = self.load(&mut file);
        self.unlock(&file);
        Ok(f(result?))
    }
}

impl Index for FileIndex {
    fn add(&self, record: DocumentRecord) -> Result<String> {
        let confirmation = record.to_string();

        let mut file = self.open_file()?;
        FileExt::lock_exclusive(&file)
            .with_context(|| format!("locking {}", self.path.display()))?;

        let result = self.load(&mut file).and_then(|mut index| {
            match index
                .records
                .iter_mut()
                .find(|existing| existing.same_key(&record))
            {
                Some(existing) => existing.title = record.title,
                None => index.records.push(record),
            }
            self.store(&mut file, &index)
        });

        self.unlock(&file);
        result.map(|_| confirmation)
    }

    fn lookup(&self, id: DocumentId) -> Result<Vec<DocumentRecord>> {
        self.read_locked(|index| {
            index
                .records
                .into_iter()
                .filter(|record| record.id == id)
                .collect()
        })
    }

    fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        self.read_locked(|index| {
            let mut records = index.records;
            records.sort_by_key(|record| record.id);
            records
        })
    }
}
