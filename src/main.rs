use anyhow::Context;
use clap::Parser;
use std::sync::Arc;

use p2p_ci::config::{Cli, Command, DirectoryArgs, PeerArgs};
use p2p_ci::directory::DirectoryServer;
use p2p_ci::peer::{DirectoryClient, PeerNode, PeerShell, is_connection_failure};
use p2p_ci::protocol::PeerAddress;
use p2p_ci::registry::{FileIndex, IndexRegistry};
use p2p_ci::storage::DocumentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .init();

    match cli.command {
        Command::Directory(args) => run_directory(args).await,
        Command::Peer(args) => run_peer(args).await,
    }
}

async fn run_directory(args: DirectoryArgs) -> anyhow::Result<()> {
    let bind_addr = args.bind_addr();
    let server = DirectoryServer::bind(bind_addr.as_str(), IndexRegistry::new())
        .await
        .with_context(|| format!("binding directory server to {}", bind_addr))?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down directory server");
            Ok(())
        }
    }
}

async fn run_peer(args: PeerArgs) -> anyhow::Result<()> {
    // 1. Local store:
    let store = Arc::new(DocumentStore::open(&args.rfc_store).await?);
    let local = PeerAddress::new(args.peer_host.clone(), args.peer_port);

    // 2. Directory client:
    let directory = if args.offline {
        let index = FileIndex::open(&args.offline_index)?;
        tracing::info!("Offline mode using {}", index.path().display());
        DirectoryClient::offline(index, local)
    } else {
        DirectoryClient::remote(args.server_host.clone(), args.server_port, local)
    };
    let node = PeerNode::new(directory, store);

    // 3. Content server, before anything is advertised:
    let bind_addr = args.content_bind_addr();
    let (bound, _server) = node
        .serve_content(bind_addr.as_str())
        .await
        .with_context(|| format!("binding content server to {}", bind_addr))?;
    tracing::info!("Peer {} serving documents on {}", node.local(), bound);

    // 4. Register what we already have:
    match node.sync_local().await {
        Ok(report) => tracing::info!(
            "Registered {} local RFC(s), {} rejected",
            report.registered,
            report.rejected
        ),
        Err(e) if is_connection_failure(&e) => {
            tracing::error!("Directory server unreachable: {:#}", e);
            return Err(e);
        }
        Err(e) => tracing::warn!("Startup sync incomplete: {:#}", e),
    }

    // 5. Interactive shell:
    let shell = PeerShell::new(node, &args.sample_dir);
    shell
        .run(tokio::io::BufReader::new(tokio::io::stdin()))
        .await
}
