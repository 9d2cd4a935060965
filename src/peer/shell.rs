use anyhow::{Context, Result, anyhow, bail};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::peer::node::{DownloadOutcome, PeerNode};
use crate::protocol::{DocumentId, PeerAddress};

pub const HELP: &str = "\
Commands:
  help                         Show this message
  sync                         Register every local RFC with the directory
  seed [dir]                   Import numbered .txt files from dir and register them
  list                         LIST ALL records known to the directory
  local                        Show RFCs stored on this peer
  lookup <rfc>                 LOOKUP which peers hold an RFC
  add <rfc> <file> <title...>  Store a file as an RFC and register it
  get <rfc> [<host> <port>]    Download an RFC from a peer (or from any holder)
  exit | quit                  Leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Sync,
    Seed(Option<PathBuf>),
    List,
    Local,
    Lookup(DocumentId),
    Add {
        id: DocumentId,
        file: PathBuf,
        title: String,
    },
    Get {
        id: DocumentId,
        peer: Option<PeerAddress>,
    },
    Exit,
}

impl ShellCommand {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match (name.to_ascii_lowercase().as_str(), args) {
            ("help" | "?", _) => ShellCommand::Help,
            ("exit" | "quit", _) => ShellCommand::Exit,
            ("sync", []) => ShellCommand::Sync,
            ("seed", []) => ShellCommand::Seed(None),
            ("seed", [dir]) => ShellCommand::Seed(Some(PathBuf::from(dir))),
            ("list", []) => ShellCommand::List,
            ("local", []) => ShellCommand::Local,
            ("lookup", [id]) => ShellCommand::Lookup(parse_id(id)?),
            ("add", [id, file, title @ ..]) if !title.is_empty() => ShellCommand::Add {
                id: parse_id(id)?,
                file: PathBuf::from(file),
                title: unquote(&title.join(" ")),
            },
            ("get", [id]) => ShellCommand::Get {
                id: parse_id(id)?,
                peer: None,
            },
            ("get", [id, host, port]) => ShellCommand::Get {
                id: parse_id(id)?,
                peer: Some(PeerAddress::new(*host, parse_port(port)?)),
            },
            ("sync" | "seed" | "list" | "local" | "lookup" | "add" | "get", _) => {
                bail!("wrong arguments for '{}' (type 'help')", name)
            }
            _ => bail!("unknown command '{}' (type 'help')", name),
        };
        Ok(Some(command))
    }
}

fn parse_id(token: &str) -> Result<DocumentId> {
    token
        .parse()
        .map_err(|_| anyhow!("'{}' is not a valid RFC number", token))
}

fn parse_port(token: &str) -> Result<u16> {
    match token.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => bail!("'{}' is not a valid port", token),
    }
}

fn unquote(title: &str) -> String {
    let trimmed = title.trim();
    ['"', '\'']
        .iter()
        .find_map(|q| {
            trimmed
                .strip_prefix(*q)
                .and_then(|rest| rest.strip_suffix(*q))
        })
        .unwrap_or(trimmed)
        .to_string()
}

/// Interactive front end over a [`PeerNode`].
pub struct PeerShell {
    node: PeerNode,
    sample_dir: PathBuf,
}

impl PeerShell {
    pub fn new(node: PeerNode, sample_dir: impl Into<PathBuf>) -> Self {
        Self {
            node,
            sample_dir: sample_dir.into(),
        }
    }

    pub fn node(&self) -> &PeerNode {
        &self.node
    }

    /// Reads commands line by line until `exit` or end of input.
    ///
    /// A failing command prints its error; the shell keeps going.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, input: R) -> Result<()> {
        let mut lines = input.lines();
        println!("{}", HELP);

        loop {
            print!("p2p-ci> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                return Ok(());
            };

            match ShellCommand::parse(&line) {
                Ok(None) => {}
                Ok(Some(ShellCommand::Exit)) => return Ok(()),
                Ok(Some(command)) => match self.execute(command).await {
                    Ok(output) => println!("{}", output),
                    Err(e) => {
                        tracing::debug!("Command failed: {:?}", e);
                        println!("error: {:#}", e);
                    }
                },
                Err(e) => println!("error: {:#}", e),
            }
        }
    }

    /// Runs one command and renders its result as text.
    pub async fn execute(&self, command: ShellCommand) -> Result<String> {
        let mut out = String::new();

        match command {
            ShellCommand::Help => out.push_str(HELP),
            ShellCommand::Exit => {}
            ShellCommand::Sync => {
                let report = self.node.sync_local().await?;
                write!(
                    out,
                    "Registered {} RFC(s), {} rejected",
                    report.registered, report.rejected
                )?;
            }
            ShellCommand::Seed(dir) => {
                let dir = dir.unwrap_or_else(|| self.sample_dir.clone());
                let (imported, report) = self.node.seed(&dir).await?;
                write!(
                    out,
                    "Imported {} file(s) from {}; registered {} RFC(s)",
                    imported,
                    dir.display(),
                    report.registered
                )?;
            }
            ShellCommand::List => {
                let reply = self.node.list().await?;
                out.push_str(reply.raw_text().trim_end());
                if reply.records.is_empty() {
                    out.push_str("\n(no records)");
                }
            }
            ShellCommand::Local => {
                let documents = self.node.local_documents().await?;
                if documents.is_empty() {
                    write!(out, "No RFCs in {}", self.node.store().root().display())?;
                }
                for (i, document) in documents.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                    }
                    write!(out, "RFC {}  {}", document.id, document.path.display())?;
                }
            }
            ShellCommand::Lookup(id) => {
                let reply = self.node.lookup(id).await?;
                out.push_str(reply.raw_text().trim_end());
                if reply.records.is_empty() {
                    write!(out, "\n(no peer holds RFC {})", id)?;
                }
            }
            ShellCommand::Add { id, file, title } => {
                let reply = self
                    .node
                    .add_local(id, &file, &title)
                    .await
                    .with_context(|| format!("adding RFC {}", id))?;
                out.push_str(reply.raw_text().trim_end());
            }
            ShellCommand::Get { id, peer: Some(peer) } => {
                let download = self.node.download(id, &peer, None).await?;
                out.push_str(download.fetched.head_text().trim_end());
                write!(out, "\nSaved RFC {} to {}", id, download.path.display())?;
            }
            ShellCommand::Get { id, peer: None } => {
                let holders = self.node.lookup(id).await?.records;
                match self.node.download_from_peers(id, &holders).await? {
                    DownloadOutcome::AlreadyLocal(path) => {
                        write!(out, "RFC {} is already stored at {}", id, path.display())?;
                    }
                    DownloadOutcome::Downloaded(download) => {
                        out.push_str(download.fetched.head_text().trim_end());
                        write!(
                            out,
                            "\nSaved RFC {} from {} to {}",
                            id,
                            download.source,
                            download.path.display()
                        )?;
                    }
                }
            }
        }

        Ok(out)
    }
}
