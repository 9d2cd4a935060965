//! Peer Content Server
//!
//! Serves this peer's documents to other peers. Each connection carries exactly
//! one `GET RFC <n>` request, checked in this order:
//!
//! 1. unframed message, fewer than three start-line tokens or a bad header
//!    line -> `400`
//! 2. protocol version other than `P2P-CI/1.0` -> `505`
//! 3. method other than `GET`, resource other than `RFC <n>`, or missing
//!    `Host` / `OS` header -> `400`
//! 4. no local file for the document -> `404`
//! 5. otherwise `200` with `Date`, `OS`, `Last-Modified`, `Content-Length` and
//!    `Content-Type: text/plain`, followed by the file bytes.

pub mod server;

pub use server::{ContentServer, http_date, local_os, respond};
