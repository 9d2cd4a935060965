//! P2P-CI Document Sharing Library
//!
//! A centralized-index peer-to-peer system: one directory server knows which
//! peer holds which RFC document, and peers fetch documents directly from each
//! other over the same text protocol.
//!
//! ## Architecture Modules
//!
//! - **`protocol`**: The `P2P-CI/1.0` wire format. Message types, the CRLF codec,
//!   framing over a byte stream and typed request validation.
//! - **`registry`**: The directory's index of (document, holder) records, in memory
//!   for the server and as a locked JSON file for offline mode.
//! - **`directory`**: The TCP directory server answering `ADD`, `LOOKUP` and `LIST`.
//! - **`storage`**: A peer's local document files.
//! - **`content`**: The TCP server answering `GET` requests from other peers.
//! - **`peer`**: Directory and fetch clients, the peer orchestrator and its shell.
//! - **`config`**: Command line arguments of the binary.

pub mod config;
pub mod content;
pub mod directory;
pub mod peer;
pub mod protocol;
pub mod registry;
pub mod storage;
