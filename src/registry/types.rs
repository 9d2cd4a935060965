use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::{CRLF, DocumentId, PeerAddress};

/// One peer advertising one document.
///
/// Displays as the directory's wire line: `RFC <id> <title> <host> <port>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub title: String,
    pub host: String,
    pub port: u16,
}

impl DocumentRecord {
    pub fn new(id: DocumentId, title: impl Into<String>, peer: PeerAddress) -> Self {
        Self {
            id,
            title: title.into(),
            host: peer.host,
            port: peer.port,
        }
    }

    pub fn peer(&self) -> PeerAddress {
        PeerAddress::new(self.host.clone(), self.port)
    }

    pub fn same_key(&self, other: &DocumentRecord) -> bool {
        self.id == other.id && self.host == other.host && self.port == other.port
    }

    /// Parses a directory body line. The title may contain spaces: host and port
    /// are always the last two tokens.
    pub fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 || parts[0] != "RFC" {
            return None;
        }
        let id = parts[1].parse().ok()?;
        let port = parts[parts.len() - 1].parse().ok()?;
        let host = parts[parts.len() - 2].to_string();
        let title = parts[2..parts.len() - 2].join(" ");
        Some(Self {
            id,
            title,
            host,
            port,
        })
    }
}

impl fmt::Display for DocumentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RFC {} {} {} {}",
            self.id, self.title, self.host, self.port
        )
    }
}

/// Joins records into a directory response body, one line each.
pub fn format_records(records: &[DocumentRecord]) -> String {
    records
        .iter()
        .map(|record| record.to_string())
        .collect::<Vec<_>>()
        .join(CRLF)
}
