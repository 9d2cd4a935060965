//! P2P-CI Wire Protocol
//!
//! Text-framed request/response messages shared by directory traffic and
//! peer-to-peer document transfer.
//!
//! ## Message Layout
//! ```text
//! <METHOD> <RESOURCE> <VERSION>\r\n      (requests)
//! <VERSION> <CODE> <REASON>\r\n          (responses)
//! <Header-Name>: <value>\r\n
//! \r\n
//! <optional body bytes>
//! ```
//!
//! ## Layers
//! - **`codec`**: byte-level encode/decode plus `read_frame`, which pulls one complete
//!   message off a stream regardless of how the bytes were split across reads.
//! - **`request`**: turns a syntactically valid `Request` into a typed, validated
//!   variant (`DirectoryRequest`, `FetchRequest`). Version checks and
//!   per-method header requirements live here, not in the decoder.
//! - **`error`**: `ProtocolError` and its mapping onto response status codes.

pub mod codec;
pub mod error;
pub mod request;
pub mod types;

pub use codec::{decode_request, decode_response, encode_request, encode_response, read_frame};
pub use error::ProtocolError;
pub use request::{DirectoryRequest, FetchRequest, PeerAddress};
pub use types::*;
