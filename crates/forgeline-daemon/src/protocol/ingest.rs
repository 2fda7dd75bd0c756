//! Build event stream ingestion and dispatch.
//!
//! [`BuildEventService`] owns the protocol-layer behavior of the two
//! publish endpoints:
//!
//! - `publish_build_tool_event_stream`: one call per streaming session.
//!   Events are processed strictly in arrival order; each accepted event
//!   advances the session's sequence baseline and is acknowledged with the
//!   baseline it established. A gap or repeat in the sequence ends the
//!   session by signaling clean end-of-stream rather than an error; client
//!   retry logic is built around receiving an ordinary stream end and
//!   reopening a fresh session.
//! - `publish_lifecycle_event`: unary, acknowledged unconditionally. The
//!   daemon does not currently interpret lifecycle events.
//!
//! The transport is abstracted behind [`EventStream`] so sessions can be
//! driven by the UDS connection in [`super::server`] or by an in-memory
//! double in tests.

use async_trait::async_trait;
use forgeline_core::envelope;
use forgeline_core::wire::{
    build_event, tool_build_event, Empty, OrderedBuildEvent,
    PublishBuildToolEventStreamRequest, PublishBuildToolEventStreamResponse,
    PublishLifecycleEventRequest, ToolBuildEvent,
};
use tracing::{debug, warn};

use super::error::{ProtocolError, ProtocolResult};

/// Bidirectional transport carrying one streaming session.
///
/// `recv` returning `Ok(None)` means the client half-closed the stream;
/// the session then ends successfully.
#[async_trait]
pub trait EventStream: Send {
    /// Receives the next request, or `None` on clean end-of-input.
    async fn recv(&mut self) -> ProtocolResult<Option<PublishBuildToolEventStreamRequest>>;

    /// Sends one acknowledgment.
    async fn send(&mut self, response: PublishBuildToolEventStreamResponse) -> ProtocolResult<()>;
}

/// Handler for the build event publish endpoints.
///
/// Stateless; the only per-session state is the sequence baseline, owned
/// by the session loop itself. One instance serves any number of
/// concurrent sessions.
#[derive(Debug, Default)]
pub struct BuildEventService {}

impl BuildEventService {
    /// Creates the service.
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Serves one streaming session until it ends.
    ///
    /// Acknowledgments are 1:1 with accepted events, in arrival order; no
    /// acknowledgment is ever sent for an event that failed dispatch or
    /// violated ordering. Acknowledgment sends are best-effort: a send
    /// failure is logged and the session continues.
    ///
    /// # Errors
    ///
    /// Returns transport receive errors and dispatch (decode) errors.
    /// Ordering violations are NOT errors: the session ends with `Ok(())`
    /// after logging the expected and received sequence numbers.
    pub async fn publish_build_tool_event_stream<S>(&self, stream: &mut S) -> ProtocolResult<()>
    where
        S: EventStream,
    {
        // The first event's sequence number is adopted unconditionally as
        // the baseline; after that only baseline + 1 is accepted.
        let mut last_received: Option<i64> = None;
        loop {
            let Some(request) = stream.recv().await? else {
                return Ok(());
            };
            let ordered = request
                .ordered_build_event
                .ok_or(ProtocolError::missing_field("ordered_build_event"))?;

            self.chomp_build_event(&ordered)?;

            let sequence = ordered.sequence_number;
            match last_received {
                None => last_received = Some(sequence),
                Some(prev) if prev.checked_add(1) == Some(sequence) => {
                    last_received = Some(sequence);
                },
                Some(prev) => {
                    warn!(
                        expected = prev.saturating_add(1),
                        received = sequence,
                        "out-of-order build event, closing stream"
                    );
                    return Ok(());
                },
            }

            let response = PublishBuildToolEventStreamResponse {
                stream_id: ordered.stream_id,
                sequence_number: sequence,
            };
            if let Err(error) = stream.send(response).await {
                warn!(%error, "failed to send build event ack");
            }
        }
    }

    /// Acknowledges a lifecycle event.
    ///
    /// Always succeeds; the event is accepted but not interpreted. This is
    /// the designated extension point for lifecycle handling.
    #[must_use]
    pub fn publish_lifecycle_event(&self, request: &PublishLifecycleEventRequest) -> Empty {
        debug!(
            has_event = request.build_event.is_some(),
            "lifecycle event acknowledged"
        );
        Empty {}
    }

    /// Dispatches one event by kind.
    ///
    /// Total over the kind set: unknown kinds are logged and accepted.
    /// The only fatal path is a nested tool event whose encapsulated
    /// payload fails to unwrap.
    fn chomp_build_event(&self, ordered: &OrderedBuildEvent) -> ProtocolResult<()> {
        let Some(event) = ordered.event.as_ref().and_then(|e| e.event.as_ref()) else {
            debug!(
                sequence = ordered.sequence_number,
                "build event with no recognized kind"
            );
            return Ok(());
        };
        match event {
            build_event::Event::ComponentStreamFinished(finished) => {
                debug!(finish_type = finished.finish_type, "component stream finished");
            },
            build_event::Event::BuildEnqueued(_) => {
                debug!(sequence = ordered.sequence_number, "build enqueued");
            },
            build_event::Event::BuildFinished(finished) => {
                debug!(exit_code = finished.exit_code, "build finished");
            },
            build_event::Event::ToolEvent(payload) => {
                let tool_event: ToolBuildEvent = envelope::unpack(payload)?;
                Self::chomp_tool_event(&tool_event);
            },
        }
        Ok(())
    }

    /// Sub-dispatches an unwrapped tool event.
    fn chomp_tool_event(event: &ToolBuildEvent) {
        match event.payload.as_ref() {
            Some(tool_build_event::Payload::Progress(progress)) => {
                debug!(
                    stdout_len = progress.stdout.len(),
                    stderr_len = progress.stderr.len(),
                    "tool progress"
                );
            },
            Some(tool_build_event::Payload::Started(started)) => {
                debug!(uuid = %started.uuid, "tool invocation started");
            },
            Some(tool_build_event::Payload::Finished(finished)) => {
                debug!(exit_code = finished.exit_code, "tool invocation finished");
            },
            None => {
                debug!("tool event with no recognized payload");
            },
        }
    }
}
