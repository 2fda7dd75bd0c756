//! Unix-domain-socket protocol and event stream ingestion.
//!
//! The protocol stack is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Build Event Ingestion           │  ingest (protobuf)
//! ├─────────────────────────────────────────┤
//! │            Tagged Messages               │  [tag u8][payload]
//! ├─────────────────────────────────────────┤
//! │               Framing                    │  Length-prefixed
//! ├─────────────────────────────────────────┤
//! │            UDS Transport                 │  Unix socket
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Module Overview
//!
//! - [`error`]: Protocol error types ([`ProtocolError`], [`ProtocolResult`])
//! - [`framing`]: Length-prefixed frame codec ([`FrameCodec`])
//! - [`ingest`]: Event stream ingestion and dispatch ([`BuildEventService`])
//! - [`server`]: Connection handling and the accept loop ([`EventServer`])
//!
//! # Wire Format
//!
//! Frames are length-prefixed binary:
//!
//! ```text
//! +----------------------------+------------------+
//! | Length (4 bytes, BE)       | Payload          |
//! +----------------------------+------------------+
//! ```
//!
//! - Maximum frame size: 16 MiB, validated before allocation
//! - Payload: one tag byte selecting the endpoint, then protobuf bytes
//!
//! The first frame on a connection selects the call: a lifecycle frame is
//! answered inline and closes the call, a build-tool event frame opens a
//! streaming session that lasts until the client half-closes or an
//! ordering violation ends it.

pub mod error;
pub mod framing;
pub mod ingest;
pub mod server;

// Re-export commonly used types at module level
pub use error::{ProtocolError, ProtocolResult, MAX_FRAME_SIZE};
pub use framing::FrameCodec;
pub use ingest::{BuildEventService, EventStream};
pub use server::{ClientMessage, ClientMessageType, Connection, EventServer};
