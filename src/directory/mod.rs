//! Directory Server
//!
//! Accepts TCP connections from peers and answers exactly one directory request
//! (`ADD`, `LOOKUP`, `LIST`) per connection.
//!
//! ## Connection Lifecycle
//! `AwaitRequest -> Decode -> Validate -> Execute -> Respond -> Close`
//!
//! - Every accepted connection is handled by its own task; there is no limit on
//!   concurrent connections.
//! - Protocol errors become a status line on the same connection (400 or 505) and
//!   never reach the accept loop.
//! - A lookup or list that matches nothing is `200 OK` with an empty body; the
//!   directory never answers 404.

pub mod dispatcher;

pub use dispatcher::{DirectoryServer, dispatch, execute};

/// Default listening port of the directory server.
pub const DEFAULT_PORT: u16 = 7734;

#[cfg(test)]
mod tests;
