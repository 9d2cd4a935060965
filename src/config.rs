//! Command line configuration for the `p2p-ci` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::directory::DEFAULT_PORT;

/// Default port of a peer's content server.
pub const DEFAULT_PEER_PORT: u16 = 6000;

#[derive(Debug, Parser)]
#[command(name = "p2p-ci", version, about = "Centralized-index peer-to-peer document sharing")]
pub struct Cli {
    /// Log every protocol message at DEBUG level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the central directory server
    Directory(DirectoryArgs),
    /// Run a peer: content server plus interactive shell
    Peer(PeerArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DirectoryArgs {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl DirectoryArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Args)]
pub struct PeerArgs {
    /// Directory server host
    #[arg(long, default_value = "localhost")]
    pub server_host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub server_port: u16,

    /// Host name other peers use to reach this peer
    #[arg(long, default_value = "localhost")]
    pub peer_host: String,

    /// Port of this peer's content server
    #[arg(long, default_value_t = DEFAULT_PEER_PORT, value_parser = clap::value_parser!(u16).range(1..))]
    pub peer_port: u16,

    /// Address the content server binds to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_host: String,

    /// Directory holding this peer's documents
    #[arg(long, default_value = "rfc_store")]
    pub rfc_store: PathBuf,

    /// Directory the `seed` command imports from
    #[arg(long, default_value = "sample_rfc")]
    pub sample_dir: PathBuf,

    /// Use a shared JSON index file instead of a directory server
    #[arg(long)]
    pub offline: bool,

    #[arg(long, default_value = "offline_index.json")]
    pub offline_index: PathBuf,
}

impl PeerArgs {
    pub fn content_bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.peer_port)
    }
}
