//! End-to-end tests for the event stream server over a real Unix socket.
//!
//! A client publishes tagged, length-prefixed frames exactly as a build
//! tool would and asserts on the acknowledgments coming back.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use forgeline_core::wire::{
    BuildEvent, Empty, OrderedBuildEvent, PublishBuildToolEventStreamRequest,
    PublishBuildToolEventStreamResponse, PublishLifecycleEventRequest, StreamId,
};
use forgeline_daemon::config::DaemonConfig;
use forgeline_daemon::protocol::{ClientMessage, ClientMessageType, EventServer, FrameCodec};
use futures::{SinkExt, StreamExt};
use prost::Message;
use tempfile::TempDir;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::Framed;

const TEST_TIMEOUT: Duration = Duration::from_secs(2);

type ClientFramed = Framed<UnixStream, FrameCodec>;

/// Binds a server in a fresh tempdir and runs it on its own task.
fn start_server(tmp: &TempDir) -> (std::path::PathBuf, JoinHandle<()>) {
    let socket_path = tmp.path().join("forgelined.sock");
    let config = DaemonConfig {
        socket_path: socket_path.clone(),
        ..DaemonConfig::default()
    };
    let server = EventServer::bind(&config).expect("bind failed");
    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });
    (socket_path, handle)
}

async fn connect(socket_path: &Path) -> ClientFramed {
    let stream = timeout(TEST_TIMEOUT, UnixStream::connect(socket_path))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    Framed::new(stream, FrameCodec::new())
}

fn event_frame(sequence: i64) -> Bytes {
    ClientMessage::BuildToolEvent(PublishBuildToolEventStreamRequest {
        ordered_build_event: Some(OrderedBuildEvent::new(
            StreamId::for_invocation("build-e2e", "inv-1"),
            sequence,
            BuildEvent { event: None },
        )),
    })
    .encode()
}

async fn next_frame(client: &mut ClientFramed) -> Option<Bytes> {
    timeout(TEST_TIMEOUT, client.next())
        .await
        .expect("read timed out")
        .map(|frame| frame.expect("frame error"))
}

async fn read_ack(client: &mut ClientFramed) -> PublishBuildToolEventStreamResponse {
    let frame = next_frame(client).await.expect("stream ended early");
    assert_eq!(frame[0], ClientMessageType::BuildToolEvent.tag());
    PublishBuildToolEventStreamResponse::decode(&frame[1..]).expect("ack decode failed")
}

#[tokio::test]
async fn test_stream_publish_acks_in_order() {
    let tmp = TempDir::new().unwrap();
    let (socket_path, server) = start_server(&tmp);
    let mut client = connect(&socket_path).await;

    for sequence in [1, 2, 3] {
        client.send(event_frame(sequence)).await.expect("send failed");
    }

    for sequence in [1, 2, 3] {
        let ack = read_ack(&mut client).await;
        assert_eq!(ack.sequence_number, sequence);
        assert_eq!(ack.stream_id.unwrap().build_id, "build-e2e");
    }

    server.abort();
}

#[tokio::test]
async fn test_out_of_order_event_closes_stream_without_error() {
    let tmp = TempDir::new().unwrap();
    let (socket_path, server) = start_server(&tmp);
    let mut client = connect(&socket_path).await;

    client.send(event_frame(5)).await.expect("send failed");
    client.send(event_frame(7)).await.expect("send failed");

    let ack = read_ack(&mut client).await;
    assert_eq!(ack.sequence_number, 5);

    // The gap ends the session as an ordinary stream end, not an error.
    assert!(next_frame(&mut client).await.is_none());

    server.abort();
}

#[tokio::test]
async fn test_lifecycle_event_round_trips_empty_ack() {
    let tmp = TempDir::new().unwrap();
    let (socket_path, server) = start_server(&tmp);
    let mut client = connect(&socket_path).await;

    let frame = ClientMessage::Lifecycle(PublishLifecycleEventRequest { build_event: None })
        .encode();
    client.send(frame).await.expect("send failed");

    let frame = next_frame(&mut client).await.expect("no lifecycle ack");
    assert_eq!(frame[0], ClientMessageType::Lifecycle.tag());
    let _ack = Empty::decode(&frame[1..]).expect("ack decode failed");

    server.abort();
}

#[tokio::test]
async fn test_half_close_ends_session_cleanly() {
    let tmp = TempDir::new().unwrap();
    let (socket_path, server) = start_server(&tmp);
    let mut client = connect(&socket_path).await;

    client.send(event_frame(10)).await.expect("send failed");
    let ack = read_ack(&mut client).await;
    assert_eq!(ack.sequence_number, 10);

    // Dropping the client half-closes the connection; the server side must
    // treat that as a successful session end (nothing to assert beyond the
    // server still accepting new connections afterwards).
    drop(client);

    let mut client = connect(&socket_path).await;
    client.send(event_frame(1)).await.expect("send failed");
    let ack = read_ack(&mut client).await;
    assert_eq!(ack.sequence_number, 1);

    server.abort();
}
