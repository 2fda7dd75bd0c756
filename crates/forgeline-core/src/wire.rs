//! Protocol buffer message types for the forgeline.v1 wire protocol.
//!
//! Two message families share this module:
//!
//! - **Build event stream**: [`OrderedBuildEvent`] and friends, carried over
//!   the bidirectional publish channel. Each ordered event holds a
//!   [`StreamId`], a sequence number, and exactly one [`BuildEvent`] kind;
//!   accepted events are acknowledged with
//!   [`PublishBuildToolEventStreamResponse`].
//! - **Remote execution**: [`Digest`], [`ExecutionStage`], and the
//!   long-running [`Operation`] envelope assembled by
//!   [`crate::operation::assemble`].
//!
//! Messages are hand-written prost structs with explicit field tags; the
//! tags are the wire contract and must never be reused or renumbered.

use prost::Message;

use crate::envelope::TypedPayload;

// ============================================================================
// Build event stream
// ============================================================================

/// Component of the build tool that produced a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StreamComponent {
    /// Component not set.
    Unknown    = 0,
    /// The build controller.
    Controller = 1,
    /// A remote worker.
    Worker     = 2,
    /// The invoking build tool itself.
    Tool       = 3,
}

/// Identifier grouping all events of one logical upload.
///
/// Echoed verbatim in every acknowledgment; stable for the session.
#[derive(Clone, PartialEq, Message)]
pub struct StreamId {
    /// Build this stream belongs to.
    #[prost(string, tag = "1")]
    pub build_id: String,

    /// Invocation within the build.
    #[prost(string, tag = "2")]
    pub invocation_id: String,

    /// Component that produced the stream.
    #[prost(enumeration = "StreamComponent", tag = "3")]
    pub component: i32,
}

impl StreamId {
    /// Creates a stream id for a tool invocation.
    #[must_use]
    pub fn for_invocation(build_id: impl Into<String>, invocation_id: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            invocation_id: invocation_id.into(),
            component: StreamComponent::Tool.into(),
        }
    }
}

/// How a component stream ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FinishType {
    /// Finish type not set.
    Unspecified = 0,
    /// The stream ended normally.
    Finished    = 1,
    /// The stream expired without a terminal event.
    Expired     = 2,
}

/// Marker that a component finished its event stream.
#[derive(Clone, PartialEq, Message)]
pub struct StreamFinished {
    /// Why the stream ended.
    #[prost(enumeration = "FinishType", tag = "1")]
    pub finish_type: i32,
}

/// Marker that a build was accepted into the queue.
#[derive(Clone, PartialEq, Message)]
pub struct BuildEnqueued {}

/// Marker that a build finished.
#[derive(Clone, PartialEq, Message)]
pub struct BuildFinished {
    /// Exit code of the build.
    #[prost(int32, tag = "1")]
    pub exit_code: i32,
}

/// One build event, exactly one kind present.
///
/// The kind set is closed on the wire but forward compatible in code: an
/// event carrying a tag this version does not know decodes with `event`
/// unset, which dispatch logs and otherwise ignores.
#[derive(Clone, PartialEq, Message)]
pub struct BuildEvent {
    /// The event kind.
    #[prost(oneof = "build_event::Event", tags = "1, 2, 3, 4")]
    pub event: Option<build_event::Event>,
}

/// Nested types for [`BuildEvent`].
pub mod build_event {
    /// The event kind carried by a [`super::BuildEvent`].
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Event {
        /// A component finished its stream.
        #[prost(message, tag = "1")]
        ComponentStreamFinished(super::StreamFinished),
        /// The build was enqueued.
        #[prost(message, tag = "2")]
        BuildEnqueued(super::BuildEnqueued),
        /// The build finished.
        #[prost(message, tag = "3")]
        BuildFinished(super::BuildFinished),
        /// An encapsulated event produced by the build tool itself.
        ///
        /// Carries a [`super::ToolBuildEvent`] as a self-describing
        /// payload; the ingestor unwraps it before dispatch.
        #[prost(message, tag = "4")]
        ToolEvent(super::super::envelope::TypedPayload),
    }
}

impl BuildEvent {
    /// Wraps a tool build event as a self-describing payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encapsulated (oversized).
    pub fn tool_event(event: &ToolBuildEvent) -> Result<Self, crate::envelope::EnvelopeError> {
        Ok(Self {
            event: Some(build_event::Event::ToolEvent(crate::envelope::pack(event)?)),
        })
    }

    /// Creates a component-stream-finished marker event.
    #[must_use]
    pub fn component_stream_finished(finish_type: FinishType) -> Self {
        Self {
            event: Some(build_event::Event::ComponentStreamFinished(StreamFinished {
                finish_type: finish_type.into(),
            })),
        }
    }
}

/// Event produced by the build tool, nested inside [`BuildEvent`] as a
/// self-describing payload.
#[derive(Clone, PartialEq, Message)]
pub struct ToolBuildEvent {
    /// The payload variant.
    #[prost(oneof = "tool_build_event::Payload", tags = "1, 2, 3")]
    pub payload: Option<tool_build_event::Payload>,
}

/// Nested types for [`ToolBuildEvent`].
pub mod tool_build_event {
    /// The payload carried by a [`super::ToolBuildEvent`].
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        /// Incremental console output.
        #[prost(message, tag = "1")]
        Progress(super::Progress),
        /// The tool started an invocation.
        #[prost(message, tag = "2")]
        Started(super::ToolStarted),
        /// The tool finished an invocation.
        #[prost(message, tag = "3")]
        Finished(super::ToolFinished),
    }
}

/// Incremental console output from the build tool.
#[derive(Clone, PartialEq, Message)]
pub struct Progress {
    /// Chunk of stdout since the previous progress event.
    #[prost(string, tag = "1")]
    pub stdout: String,

    /// Chunk of stderr since the previous progress event.
    #[prost(string, tag = "2")]
    pub stderr: String,
}

/// The build tool started an invocation.
#[derive(Clone, PartialEq, Message)]
pub struct ToolStarted {
    /// Invocation UUID chosen by the tool.
    #[prost(string, tag = "1")]
    pub uuid: String,

    /// Start time in milliseconds since the epoch.
    #[prost(int64, tag = "2")]
    pub start_time_millis: i64,
}

/// The build tool finished an invocation.
#[derive(Clone, PartialEq, Message)]
pub struct ToolFinished {
    /// Exit code reported by the tool.
    #[prost(int32, tag = "1")]
    pub exit_code: i32,
}

/// An event with its position in the stream.
#[derive(Clone, PartialEq, Message)]
pub struct OrderedBuildEvent {
    /// Stream this event belongs to.
    #[prost(message, optional, tag = "1")]
    pub stream_id: Option<StreamId>,

    /// Position in the stream. Accepted sequence numbers form a contiguous
    /// ascending run starting at the first number received.
    #[prost(int64, tag = "2")]
    pub sequence_number: i64,

    /// The event itself.
    #[prost(message, optional, tag = "3")]
    pub event: Option<BuildEvent>,
}

impl OrderedBuildEvent {
    /// Creates an ordered event.
    #[must_use]
    pub fn new(stream_id: StreamId, sequence_number: i64, event: BuildEvent) -> Self {
        Self {
            stream_id: Some(stream_id),
            sequence_number,
            event: Some(event),
        }
    }
}

/// Request message on the bidirectional publish channel.
#[derive(Clone, PartialEq, Message)]
pub struct PublishBuildToolEventStreamRequest {
    /// The event to publish.
    #[prost(message, optional, tag = "1")]
    pub ordered_build_event: Option<OrderedBuildEvent>,
}

/// Acknowledgment for one accepted event.
#[derive(Clone, PartialEq, Message)]
pub struct PublishBuildToolEventStreamResponse {
    /// Echoes the inbound stream id.
    #[prost(message, optional, tag = "1")]
    pub stream_id: Option<StreamId>,

    /// The sequence number just accepted.
    #[prost(int64, tag = "2")]
    pub sequence_number: i64,
}

/// Request for the unary lifecycle endpoint.
#[derive(Clone, PartialEq, Message)]
pub struct PublishLifecycleEventRequest {
    /// The lifecycle event; accepted but not interpreted.
    #[prost(message, optional, tag = "1")]
    pub build_event: Option<OrderedBuildEvent>,
}

/// Empty acknowledgment.
#[derive(Clone, PartialEq, Message)]
pub struct Empty {}

// ============================================================================
// Remote execution
// ============================================================================

/// A content digest: hash plus original size.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct Digest {
    /// Lowercase hex SHA-256 of the content.
    #[prost(string, tag = "1")]
    pub hash: String,

    /// Size of the content in bytes.
    #[prost(int64, tag = "2")]
    pub size_bytes: i64,
}

/// Stage of a remote execution.
///
/// Conceptually ordered, but the encoder does not enforce forward-only
/// transitions; that is the caller's responsibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ExecutionStage {
    /// Stage not set.
    Unknown    = 0,
    /// Checking the action cache.
    CacheCheck = 1,
    /// Queued for execution.
    Queued     = 2,
    /// Currently executing.
    Executing  = 3,
    /// Execution finished.
    Completed  = 4,
}

/// Progress metadata embedded in a long-running [`Operation`].
#[derive(Clone, PartialEq, Message)]
pub struct ExecuteOperationMetadata {
    /// Current stage of the execution.
    #[prost(enumeration = "ExecutionStage", tag = "1")]
    pub stage: i32,

    /// Digest of the action being executed.
    #[prost(message, optional, tag = "2")]
    pub action_digest: Option<Digest>,
}

/// Result of an executed action.
#[derive(Clone, PartialEq, Message)]
pub struct ActionResult {
    /// Exit code of the action.
    #[prost(int32, tag = "1")]
    pub exit_code: i32,

    /// Digest of the captured stdout, if any.
    #[prost(message, optional, tag = "2")]
    pub stdout_digest: Option<Digest>,

    /// Digest of the captured stderr, if any.
    #[prost(message, optional, tag = "3")]
    pub stderr_digest: Option<Digest>,
}

/// Canonical status code space for execution outcomes.
///
/// Only [`StatusCode::Ok`] is interpreted by this core (success versus
/// failure); everything else passes through to status clients untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    /// The execution succeeded.
    Ok                 = 0,
    /// The execution was cancelled by the caller.
    Cancelled          = 1,
    /// Unknown failure.
    Unknown            = 2,
    /// The action was malformed.
    InvalidArgument    = 3,
    /// The execution deadline expired.
    DeadlineExceeded   = 4,
    /// A referenced blob was not found.
    NotFound           = 5,
    /// The executor ran out of a resource.
    ResourceExhausted  = 8,
    /// A precondition for execution did not hold.
    FailedPrecondition = 9,
    /// The execution was aborted.
    Aborted            = 10,
    /// The executor hit an internal error.
    Internal           = 13,
    /// The executor was unavailable.
    Unavailable        = 14,
}

/// Status attached to a completed or failed execution.
#[derive(Clone, PartialEq, Message)]
pub struct RpcStatus {
    /// Status code; zero is success.
    #[prost(enumeration = "StatusCode", tag = "1")]
    pub code: i32,

    /// Human-readable detail, empty on success.
    #[prost(string, tag = "2")]
    pub message: String,
}

impl RpcStatus {
    /// Returns the code, or [`StatusCode::Unknown`] for values this version
    /// does not know.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::try_from(self.code).unwrap_or(StatusCode::Unknown)
    }
}

/// Response body of a finished execution, embedded in the operation's
/// `response` arm as a self-describing payload.
#[derive(Clone, PartialEq, Message)]
pub struct ExecuteResponse {
    /// The action result; present only on success.
    #[prost(message, optional, tag = "1")]
    pub result: Option<ActionResult>,

    /// Outcome status of the execution.
    #[prost(message, optional, tag = "2")]
    pub status: Option<RpcStatus>,

    /// Failure detail; populated only when the status is not OK.
    #[prost(string, tag = "3")]
    pub message: String,
}

/// Long-running operation envelope returned to execution-status clients.
#[derive(Clone, PartialEq, Message)]
pub struct Operation {
    /// Resource name derived from the action identity.
    #[prost(string, tag = "1")]
    pub name: String,

    /// Progress metadata ([`ExecuteOperationMetadata`] as a self-describing
    /// payload).
    #[prost(message, optional, tag = "2")]
    pub metadata: Option<TypedPayload>,

    /// True iff the execution reached [`ExecutionStage::Completed`].
    #[prost(bool, tag = "3")]
    pub done: bool,

    /// Terminal outcome, set once a result payload exists.
    #[prost(oneof = "operation::Result", tags = "4, 5")]
    pub result: Option<operation::Result>,
}

/// Nested types for [`Operation`].
pub mod operation {
    /// Terminal outcome of a long-running [`super::Operation`].
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Result {
        /// Operation-level failure.
        ///
        /// Not produced by this core; execution failures travel inside the
        /// `response` arm so clients see one uniform envelope shape.
        #[prost(message, tag = "4")]
        Error(super::RpcStatus),
        /// An [`super::ExecuteResponse`] as a self-describing payload.
        #[prost(message, tag = "5")]
        Response(super::super::envelope::TypedPayload),
    }
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;

    #[test]
    fn test_ordered_build_event_roundtrip() {
        let event = OrderedBuildEvent::new(
            StreamId::for_invocation("build-7", "inv-12"),
            41,
            BuildEvent::component_stream_finished(FinishType::Finished),
        );

        let bytes = event.encode_to_vec();
        let decoded = OrderedBuildEvent::decode(bytes.as_slice()).expect("decode failed");

        assert_eq!(decoded.sequence_number, 41);
        let stream_id = decoded.stream_id.as_ref().unwrap();
        assert_eq!(stream_id.build_id, "build-7");
        assert_eq!(stream_id.component, i32::from(StreamComponent::Tool));
        assert!(matches!(
            decoded.event.unwrap().event,
            Some(build_event::Event::ComponentStreamFinished(StreamFinished { finish_type }))
                if finish_type == i32::from(FinishType::Finished)
        ));
    }

    #[test]
    fn test_ack_roundtrip() {
        let ack = PublishBuildToolEventStreamResponse {
            stream_id: Some(StreamId::for_invocation("build-7", "inv-12")),
            sequence_number: -3,
        };

        let bytes = ack.encode_to_vec();
        let decoded =
            PublishBuildToolEventStreamResponse::decode(bytes.as_slice()).expect("decode failed");

        assert_eq!(decoded.sequence_number, -3);
        assert_eq!(decoded.stream_id.unwrap().invocation_id, "inv-12");
    }

    #[test]
    fn test_tool_event_wraps_typed_payload() {
        let inner = ToolBuildEvent {
            payload: Some(tool_build_event::Payload::Finished(ToolFinished { exit_code: 2 })),
        };
        let event = BuildEvent::tool_event(&inner).expect("pack failed");

        let Some(build_event::Event::ToolEvent(payload)) = &event.event else {
            panic!("expected tool event variant");
        };
        let decoded: ToolBuildEvent = crate::envelope::unpack(payload).expect("unpack failed");
        assert_eq!(decoded, inner);
    }

    #[test]
    fn test_unknown_stage_value_maps_to_unknown() {
        let metadata = ExecuteOperationMetadata {
            stage: 99,
            action_digest: None,
        };
        assert_eq!(metadata.stage(), ExecutionStage::Unknown);
    }

    #[test]
    fn test_status_code_conversions() {
        assert_eq!(StatusCode::try_from(10), Ok(StatusCode::Aborted));
        assert_eq!(i32::from(StatusCode::Ok), 0);
        let status = RpcStatus {
            code: 77,
            message: String::new(),
        };
        assert_eq!(status.status_code(), StatusCode::Unknown);
    }
}
