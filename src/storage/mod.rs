//! Local Document Store
//!
//! Keeps this peer's documents as plain files in one directory, one file per
//! document, named `rfc_<n>.txt`.
//!
//! The content server only reads from the store; the peer orchestrator writes to
//! it when a document is added by hand, imported from a seed directory, or
//! downloaded from another peer.

pub mod store;

pub use store::{DocumentContent, DocumentStore, StoredDocument};
