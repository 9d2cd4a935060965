//! Peer Orchestrator
//!
//! Everything a participating peer does besides serving its own files:
//!
//! - [`client`]: the directory client (over TCP, or over a shared JSON index in
//!   offline mode) and the `GET` client used against other peers.
//! - [`node`]: startup registration of local documents, manual adds, lookups and
//!   downloads that register the downloading peer as a new holder.
//! - [`shell`]: the line-oriented command shell the `peer` binary runs.
//!
//! ## Startup
//! `OpenStore -> StartContentServer -> SyncLocal -> Shell`
//!
//! The content server is bound before the first `ADD`, so a peer is never
//! advertised before it can serve.

pub mod client;
pub mod node;
pub mod shell;

pub use client::{ClientError, DirectoryClient, DirectoryReply, FetchedDocument, fetch_document};
pub use node::{Download, DownloadOutcome, PeerNode, SyncReport, is_connection_failure};
pub use shell::{PeerShell, ShellCommand};
