//! Document Index Registry
//!
//! The directory's authoritative mapping from document identifier to the peers
//! advertising it.
//!
//! ## Contract
//! - **Key**: `(identifier, host, port)`. Re-advertising a key replaces its title
//!   in place; its position is unchanged.
//! - **Lookup**: records of one identifier in insertion order. A miss is an empty
//!   result, never an error.
//! - **List**: every record, by identifier ascending, then insertion order.
//! - **Lifetime**: no deletes. Entries live until the process exits.
//!
//! ## Implementations
//! - **`memory`**: `IndexRegistry`, the in-process registry owned by the directory
//!   server. One exclusive lock guards every operation.
//! - **`file`**: `FileIndex`, a JSON file shared by peers running without a
//!   directory server. Every operation holds an advisory lock on the file.

pub mod file;
pub mod memory;
pub mod types;

pub use file::FileIndex;
pub use memory::IndexRegistry;
pub use types::{DocumentRecord, format_records};

use crate::protocol::DocumentId;
use anyhow::Result;

/// Operations shared by every index backend.
pub trait Index: Send + Sync {
    /// Inserts or re-titles a record. Returns the confirmation line
    /// `RFC <id> <title> <host> <port>`.
    fn add(&self, record: DocumentRecord) -> Result<String>;

    fn lookup(&self, id: DocumentId) -> Result<Vec<DocumentRecord>>;

    fn list_all(&self) -> Result<Vec<DocumentRecord>>;
}

#[cfg(test)]
mod tests;
