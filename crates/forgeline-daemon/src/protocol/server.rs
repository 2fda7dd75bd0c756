//! UDS server: connection handling and the accept loop.
//!
//! Each accepted connection carries exactly one call. The first frame
//! selects it: a lifecycle frame is answered inline and the call is over;
//! a build-tool event frame opens a streaming session, and every further
//! frame on the connection must carry another event for that session.
//!
//! Frames are `[tag: u8][protobuf payload]` inside the length-prefixed
//! framing of [`super::framing`]. Responses reuse the request tag.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use forgeline_core::wire::{
    PublishBuildToolEventStreamRequest, PublishBuildToolEventStreamResponse,
    PublishLifecycleEventRequest,
};
use futures::{SinkExt, StreamExt};
use prost::Message;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn, Instrument};

use super::error::{ProtocolError, ProtocolResult};
use super::framing::FrameCodec;
use super::ingest::{BuildEventService, EventStream};
use crate::config::DaemonConfig;

// ============================================================================
// Message Type Tags (for routing)
// ============================================================================

/// Message type tags identifying the endpoint a frame addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClientMessageType {
    /// Unary lifecycle publish.
    Lifecycle      = 1,
    /// Streaming build-tool event publish.
    BuildToolEvent = 2,
}

impl ClientMessageType {
    /// Attempts to parse a message type from a tag byte.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Lifecycle),
            2 => Some(Self::BuildToolEvent),
            _ => None,
        }
    }

    /// Returns the tag byte for this message type.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

// ============================================================================
// Client messages
// ============================================================================

/// A decoded client frame.
#[derive(Debug)]
pub enum ClientMessage {
    /// Lifecycle publish request.
    Lifecycle(PublishLifecycleEventRequest),
    /// Build-tool event publish request.
    BuildToolEvent(PublishBuildToolEventStreamRequest),
}

impl ClientMessage {
    /// Parses a tagged frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] for an empty frame or an
    /// unknown tag, and [`ProtocolError::Decode`] for a payload that does
    /// not decode as the tagged message.
    pub fn from_frame(frame: &[u8]) -> ProtocolResult<Self> {
        let (&tag, payload) = frame
            .split_first()
            .ok_or_else(|| ProtocolError::invalid_frame("empty frame"))?;
        match ClientMessageType::from_tag(tag) {
            Some(ClientMessageType::Lifecycle) => Ok(Self::Lifecycle(
                PublishLifecycleEventRequest::decode(payload)?,
            )),
            Some(ClientMessageType::BuildToolEvent) => Ok(Self::BuildToolEvent(
                PublishBuildToolEventStreamRequest::decode(payload)?,
            )),
            None => Err(ProtocolError::invalid_frame(format!(
                "unknown message tag {tag}"
            ))),
        }
    }

    /// Encodes the message as a tagged frame.
    ///
    /// The format is: `[tag: u8][payload: protobuf]`.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Lifecycle(request) => {
                encode_tagged(ClientMessageType::Lifecycle.tag(), request)
            },
            Self::BuildToolEvent(request) => {
                encode_tagged(ClientMessageType::BuildToolEvent.tag(), request)
            },
        }
    }
}

/// Encodes a message behind a tag byte.
fn encode_tagged<M: Message>(tag: u8, message: &M) -> Bytes {
    let mut buf = Vec::with_capacity(1 + message.encoded_len());
    buf.push(tag);
    message.encode(&mut buf).expect("encode cannot fail");
    Bytes::from(buf)
}

// ============================================================================
// Connection
// ============================================================================

/// One accepted client connection.
pub struct Connection {
    framed: Framed<UnixStream, FrameCodec>,
    /// First stream request, read by `serve` while selecting the call.
    pending: Option<PublishBuildToolEventStreamRequest>,
}

impl Connection {
    /// Wraps a connected stream with the default codec.
    #[must_use]
    pub fn new(stream: UnixStream) -> Self {
        Self::with_codec(stream, FrameCodec::new())
    }

    /// Wraps a connected stream with a custom codec.
    #[must_use]
    pub fn with_codec(stream: UnixStream, codec: FrameCodec) -> Self {
        Self {
            framed: Framed::new(stream, codec),
            pending: None,
        }
    }

    /// Serves the connection's single call to completion.
    ///
    /// # Errors
    ///
    /// Returns transport and protocol errors; a connection closed before
    /// the first frame is not an error.
    pub async fn serve(mut self, service: &BuildEventService) -> ProtocolResult<()> {
        let Some(frame) = self.framed.next().await.transpose()? else {
            return Ok(());
        };
        match ClientMessage::from_frame(&frame)? {
            ClientMessage::Lifecycle(request) => {
                let ack = service.publish_lifecycle_event(&request);
                let frame = encode_tagged(ClientMessageType::Lifecycle.tag(), &ack);
                self.framed.send(frame).await
            },
            ClientMessage::BuildToolEvent(request) => {
                self.pending = Some(request);
                service.publish_build_tool_event_stream(&mut self).await
            },
        }
    }
}

#[async_trait]
impl EventStream for Connection {
    async fn recv(&mut self) -> ProtocolResult<Option<PublishBuildToolEventStreamRequest>> {
        if let Some(pending) = self.pending.take() {
            return Ok(Some(pending));
        }
        let Some(frame) = self.framed.next().await.transpose()? else {
            return Ok(None);
        };
        match ClientMessage::from_frame(&frame)? {
            ClientMessage::BuildToolEvent(request) => Ok(Some(request)),
            ClientMessage::Lifecycle(_) => Err(ProtocolError::invalid_frame(
                "lifecycle request inside an event stream",
            )),
        }
    }

    async fn send(&mut self, response: PublishBuildToolEventStreamResponse) -> ProtocolResult<()> {
        let frame = encode_tagged(ClientMessageType::BuildToolEvent.tag(), &response);
        self.framed.send(frame).await
    }
}

// ============================================================================
// Server
// ============================================================================

/// UDS server accepting one task per connection.
pub struct EventServer {
    listener: UnixListener,
    service: Arc<BuildEventService>,
    codec: FrameCodec,
    next_connection_id: AtomicU64,
}

impl EventServer {
    /// Binds the server socket.
    ///
    /// A stale socket file from a previous run is removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn bind(config: &DaemonConfig) -> ProtocolResult<Self> {
        if config.socket_path.exists() {
            std::fs::remove_file(&config.socket_path)?;
        }
        let listener = UnixListener::bind(&config.socket_path)?;
        info!(socket = %config.socket_path.display(), "event server bound");
        Ok(Self {
            listener,
            service: Arc::new(BuildEventService::new()),
            codec: FrameCodec::with_max_frame_size(config.max_frame_size),
            next_connection_id: AtomicU64::new(0),
        })
    }

    /// Runs the accept loop forever.
    ///
    /// Per-connection failures are logged and never tear down the server.
    ///
    /// # Errors
    ///
    /// Returns an error only if accepting fails at the listener itself.
    pub async fn run(self) -> ProtocolResult<()> {
        loop {
            let (stream, _addr) = self.listener.accept().await?;
            let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
            let connection = Connection::with_codec(stream, self.codec.clone());
            let service = Arc::clone(&self.service);
            let span = tracing::info_span!("connection", id = connection_id);
            tokio::spawn(
                async move {
                    debug!("connection accepted");
                    if let Err(error) = connection.serve(&service).await {
                        warn!(%error, "connection terminated with error");
                    } else {
                        debug!("connection closed");
                    }
                }
                .instrument(span),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use forgeline_core::wire::{BuildEvent, OrderedBuildEvent, StreamId};

    use super::*;

    #[test]
    fn test_client_message_tag_roundtrip() {
        assert_eq!(
            ClientMessageType::from_tag(ClientMessageType::Lifecycle.tag()),
            Some(ClientMessageType::Lifecycle)
        );
        assert_eq!(
            ClientMessageType::from_tag(ClientMessageType::BuildToolEvent.tag()),
            Some(ClientMessageType::BuildToolEvent)
        );
        assert_eq!(ClientMessageType::from_tag(9), None);
    }

    #[test]
    fn test_from_frame_rejects_empty_frame() {
        let err = ClientMessage::from_frame(&[]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidFrame { .. }));
    }

    #[test]
    fn test_from_frame_rejects_unknown_tag() {
        let err = ClientMessage::from_frame(&[0x7f]).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidFrame { .. }));
    }

    #[test]
    fn test_encode_from_frame_roundtrip() {
        let request = PublishBuildToolEventStreamRequest {
            ordered_build_event: Some(OrderedBuildEvent::new(
                StreamId::for_invocation("build-1", "inv-1"),
                3,
                BuildEvent { event: None },
            )),
        };
        let frame = ClientMessage::BuildToolEvent(request.clone()).encode();

        let decoded = ClientMessage::from_frame(&frame).expect("parse failed");
        let ClientMessage::BuildToolEvent(decoded) = decoded else {
            panic!("expected build tool event");
        };
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_from_frame_rejects_malformed_payload() {
        let mut frame = vec![ClientMessageType::BuildToolEvent.tag()];
        frame.extend_from_slice(&[0xff; 6]);

        let err = ClientMessage::from_frame(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
