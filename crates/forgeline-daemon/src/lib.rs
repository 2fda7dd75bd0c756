//! forgeline-daemon - Build event ingestion daemon library.
//!
//! This library provides the daemon half of the forgeline build event
//! service: a Unix-domain-socket server that accepts ordered build event
//! streams from build tools, validates strict sequence continuity, and
//! acknowledges each accepted event, plus the unary lifecycle endpoint.
//!
//! # Runtime Requirements
//!
//! The server runs on a multi-threaded tokio runtime; the `forgelined`
//! binary configures one via `#[tokio::main(flavor = "multi_thread")]`.
//! Each accepted connection is served on its own task, and sessions share
//! no mutable state.
//!
//! # Modules
//!
//! - [`config`]: Daemon configuration (TOML)
//! - [`protocol`]: Framing, connection handling, and event stream ingestion

pub mod config;
pub mod protocol;
