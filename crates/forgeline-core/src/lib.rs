//! forgeline-core - Protocol-layer types for the forgeline build event
//! service.
//!
//! This crate holds the pure, I/O-free half of the protocol: the wire
//! message types, the self-describing payload envelope, content-digest
//! resource naming, and the long-running-operation encoder used by remote
//! execution workers to report progress and outcomes.
//!
//! # Modules
//!
//! - [`wire`]: Protocol buffer message types for the build event stream and
//!   the remote execution operation envelope
//! - [`envelope`]: Self-describing payload encapsulation ([`TypedPayload`],
//!   [`pack`], [`unpack`])
//! - [`digest`]: Content digests and download resource naming
//! - [`operation`]: Assembly of long-running operations from execution state
//!
//! Everything here is synchronous and side-effect free; the daemon crate
//! owns sockets, framing, and session lifecycles.

pub mod digest;
pub mod envelope;
pub mod operation;
pub mod wire;

// Re-export commonly used types at crate level
pub use digest::{download_resource_name, InstanceDigest};
pub use envelope::{pack, unpack, EnvelopeError, TypedMessage, TypedPayload, MAX_PAYLOAD_SIZE};
pub use operation::{assemble, assemble_failed, ExecutionOutcome, OperationError};
