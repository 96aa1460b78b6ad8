//! End-to-end connection scenarios, run over an in-process transport pair:
//! the SETUP handshake, metadata push, fire-and-forget, and each of the
//! three request-bearing interaction models.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use rsocket_core::client::ClientBuilder;
use rsocket_core::error::{ErrorCode, RSocketError};
use rsocket_core::payload::Payload;
use rsocket_core::rsocket::{EchoRSocket, RSocket};
use rsocket_core::server::ServerBuilder;
use rsocket_core::sink::{NoopSubscriber, Subscriber};

use common::channel_pair;
use common::recorder::{wait_for_events, Recorder, RecordedEvent};

fn text(s: &str) -> Payload {
    Payload::builder().set_data_utf8(s).build()
}

fn data_of(events: &[RecordedEvent], i: usize) -> String {
    match &events[i] {
        RecordedEvent::Next(Some(bytes), _) => String::from_utf8(bytes.clone()).unwrap(),
        other => panic!("expected Next at index {}, got {:?}", i, other),
    }
}

/// S1: the server's accept gate sees exactly the fields the client dialed
/// with, and the client's `connect` resolves.
#[tokio::test]
async fn client_setup_is_accepted_with_exact_fields() {
    let (client_transport, server_transport) = channel_pair();
    let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
    let seen_tx = Arc::new(Mutex::new(Some(seen_tx)));

    let server = ServerBuilder::new(Arc::new(EchoRSocket)).should_accept_client(move |info| {
        if let Some(tx) = seen_tx.lock().unwrap().take() {
            let _ = tx.send(info.clone());
        }
        rsocket_core::connection::SetupOutcome::Accept
    });

    let _requester = ClientBuilder::new(client_transport)
        .keepalive_millis(500)
        .max_lifetime_millis(5000)
        .metadata_mime_type("text/plain")
        .data_mime_type("text/plain")
        .setup_payload(Payload::default())
        .connect()
        .await
        .expect("client connect");

    server.serve(server_transport).await.expect("server accept");

    let info = seen_rx.await.expect("shouldAcceptClient was invoked");
    assert_eq!(info.keepalive_millis, 500);
    assert_eq!(info.max_lifetime_millis, 5000);
    assert_eq!(info.metadata_mime_type, "text/plain");
    assert_eq!(info.data_mime_type, "text/plain");
}

/// S2: a metadata push after setup reaches the responder's `metadata_push`
/// with the exact bytes sent.
#[tokio::test]
async fn metadata_push_reaches_responder() {
    struct MetadataRecorder {
        seen: Arc<Mutex<Vec<Bytes>>>,
    }
    impl RSocket for MetadataRecorder {
        fn metadata_push(&self, metadata: Bytes) {
            self.seen.lock().unwrap().push(metadata);
        }
        fn fire_and_forget(&self, _payload: Payload) {}
        fn request_response(&self, _p: Payload, _d: Box<dyn Subscriber>) -> Box<dyn Subscriber> {
            Box::new(NoopSubscriber)
        }
        fn request_stream(&self, _p: Payload, _n: u32, _d: Box<dyn Subscriber>) -> Box<dyn Subscriber> {
            Box::new(NoopSubscriber)
        }
        fn request_channel(
            &self,
            _p: Payload,
            _n: u32,
            _c: bool,
            _d: Box<dyn Subscriber>,
        ) -> Box<dyn Subscriber> {
            Box::new(NoopSubscriber)
        }
    }

    let (client_transport, server_transport) = channel_pair();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let server = ServerBuilder::new(Arc::new(MetadataRecorder { seen: seen.clone() }));

    let requester = ClientBuilder::new(client_transport).connect().await.unwrap();
    server.serve(server_transport).await.unwrap();

    requester.metadata_push(Bytes::from_static(b"Hello World"));

    let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
    loop {
        if !seen.lock().unwrap().is_empty() {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("metadata push never arrived");
        }
        tokio::time::delay_for(Duration::from_millis(5)).await;
    }
    assert_eq!(seen.lock().unwrap()[0], Bytes::from_static(b"Hello World"));
}

/// S3: fire-and-forget delivers exactly one payload to the responder.
#[tokio::test]
async fn fire_and_forget_delivers_once() {
    struct FnfRecorder {
        seen: Arc<Mutex<Vec<Payload>>>,
    }
    impl RSocket for FnfRecorder {
        fn metadata_push(&self, _metadata: Bytes) {}
        fn fire_and_forget(&self, payload: Payload) {
            self.seen.lock().unwrap().push(payload);
        }
        fn request_response(&self, _p: Payload, _d: Box<dyn Subscriber>) -> Box<dyn Subscriber> {
            Box::new(NoopSubscriber)
        }
        fn request_stream(&self, _p: Payload, _n: u32, _d: Box<dyn Subscriber>) -> Box<dyn Subscriber> {
            Box::new(NoopSubscriber)
        }
        fn request_channel(
            &self,
            _p: Payload,
            _n: u32,
            _c: bool,
            _d: Box<dyn Subscriber>,
        ) -> Box<dyn Subscriber> {
            Box::new(NoopSubscriber)
        }
    }

    let (client_transport, server_transport) = channel_pair();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let server = ServerBuilder::new(Arc::new(FnfRecorder { seen: seen.clone() }));

    let requester = ClientBuilder::new(client_transport).connect().await.unwrap();
    server.serve(server_transport).await.unwrap();

    requester.fire_and_forget(text("Hello World"));

    let deadline = tokio::time::Instant::now() + Duration::from_millis(200);
    loop {
        if !seen.lock().unwrap().is_empty() {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("fire-and-forget never arrived");
        }
        tokio::time::delay_for(Duration::from_millis(5)).await;
    }
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].data().as_ref().unwrap(), &Bytes::from_static(b"Hello World"));
}

/// S4: request/response echoes the payload back with COMPLETE.
#[tokio::test]
async fn request_response_echoes_payload() {
    let (client_transport, server_transport) = channel_pair();
    let server = ServerBuilder::new(Arc::new(EchoRSocket));
    let requester = ClientBuilder::new(client_transport).connect().await.unwrap();
    server.serve(server_transport).await.unwrap();

    let recorder = Recorder::new();
    let _handle = requester
        .request_response(text("Hello World"), Box::new(recorder.clone()))
        .await
        .unwrap();

    wait_for_events(&recorder, 1, Duration::from_millis(200)).await;
    let events = recorder.snapshot();
    assert_eq!(events, vec![RecordedEvent::Next(Some(b"Hello World".to_vec()), true)]);
}

/// S5: request/stream splits its response into seven chunks, terminating
/// the last one with COMPLETE.
#[tokio::test]
async fn request_stream_emits_seven_chunks() {
    struct ChunkingResponder;
    impl RSocket for ChunkingResponder {
        fn metadata_push(&self, _metadata: Bytes) {}
        fn fire_and_forget(&self, _payload: Payload) {}
        fn request_response(&self, payload: Payload, mut downstream: Box<dyn Subscriber>) -> Box<dyn Subscriber> {
            downstream.on_next(payload, true);
            Box::new(NoopSubscriber)
        }
        fn request_stream(
            &self,
            _payload: Payload,
            _initial_request_n: u32,
            mut downstream: Box<dyn Subscriber>,
        ) -> Box<dyn Subscriber> {
            let chunks = ["Hello", " ", "W", "o", "r", "l", "d"];
            let last = chunks.len() - 1;
            for (i, chunk) in chunks.iter().enumerate() {
                downstream.on_next(text(chunk), i == last);
            }
            Box::new(NoopSubscriber)
        }
        fn request_channel(
            &self,
            payload: Payload,
            _initial_request_n: u32,
            is_completed: bool,
            mut downstream: Box<dyn Subscriber>,
        ) -> Box<dyn Subscriber> {
            downstream.on_next(payload, is_completed);
            Box::new(NoopSubscriber)
        }
    }

    let (client_transport, server_transport) = channel_pair();
    let server = ServerBuilder::new(Arc::new(ChunkingResponder));
    let requester = ClientBuilder::new(client_transport).connect().await.unwrap();
    server.serve(server_transport).await.unwrap();

    let recorder = Recorder::new();
    let _handle = requester
        .request_stream(text("Hello World!"), rsocket_core::frame::REQUEST_MAX, Box::new(recorder.clone()))
        .await
        .unwrap();

    wait_for_events(&recorder, 7, Duration::from_millis(200)).await;
    let events = recorder.snapshot();
    assert_eq!(events.len(), 7);
    assert_eq!(data_of(&events, 0), "Hello");
    assert_eq!(data_of(&events, 1), " ");
    assert_eq!(data_of(&events, 2), "W");
    assert_eq!(data_of(&events, 3), "o");
    assert_eq!(data_of(&events, 4), "r");
    assert_eq!(data_of(&events, 5), "l");
    assert_eq!(data_of(&events, 6), "d");
    match &events[6] {
        RecordedEvent::Next(_, is_completion) => assert!(*is_completion),
        other => panic!("expected Next, got {:?}", other),
    }
}

/// S6: a channel echoes its initial payload, then echoes every subsequent
/// payload the requester sends, completing when the requester does.
#[tokio::test]
async fn channel_echoes_initial_and_mid_stream_sends() {
    struct EchoChannel {
        downstream: Box<dyn Subscriber>,
    }
    impl Subscriber for EchoChannel {
        fn on_next(&mut self, payload: Payload, is_completion: bool) {
            self.downstream.on_next(payload, is_completion);
        }
        fn on_complete(&mut self) {
            self.downstream.on_complete();
        }
        fn on_error(&mut self, error: RSocketError) {
            self.downstream.on_error(error);
        }
        fn on_cancel(&mut self) {
            self.downstream.on_cancel();
        }
        fn on_request_n(&mut self, n: u32) {
            self.downstream.on_request_n(n);
        }
    }
    struct ChannelEchoResponder;
    impl RSocket for ChannelEchoResponder {
        fn metadata_push(&self, _metadata: Bytes) {}
        fn fire_and_forget(&self, _payload: Payload) {}
        fn request_response(&self, payload: Payload, mut downstream: Box<dyn Subscriber>) -> Box<dyn Subscriber> {
            downstream.on_next(payload, true);
            Box::new(NoopSubscriber)
        }
        fn request_stream(
            &self,
            payload: Payload,
            _initial_request_n: u32,
            mut downstream: Box<dyn Subscriber>,
        ) -> Box<dyn Subscriber> {
            downstream.on_next(payload, true);
            Box::new(NoopSubscriber)
        }
        fn request_channel(
            &self,
            payload: Payload,
            _initial_request_n: u32,
            is_completed: bool,
            mut downstream: Box<dyn Subscriber>,
        ) -> Box<dyn Subscriber> {
            downstream.on_next(payload, is_completed);
            Box::new(EchoChannel { downstream })
        }
    }

    let (client_transport, server_transport) = channel_pair();
    let server = ServerBuilder::new(Arc::new(ChannelEchoResponder));
    let requester = ClientBuilder::new(client_transport).connect().await.unwrap();
    server.serve(server_transport).await.unwrap();

    let recorder = Recorder::new();
    let mut handle = requester
        .request_channel(text("Hello"), rsocket_core::frame::REQUEST_MAX, false, Box::new(recorder.clone()))
        .await
        .unwrap();

    for chunk in [" ", "W", "o", "r", "l", "d"].iter() {
        handle.on_next(text(chunk), false);
    }
    handle.on_complete();

    wait_for_events(&recorder, 8, Duration::from_millis(300)).await;
    let events = recorder.snapshot();
    assert_eq!(events.len(), 8);
    assert_eq!(data_of(&events, 0), "Hello");
    assert_eq!(data_of(&events, 1), " ");
    assert_eq!(data_of(&events, 2), "W");
    assert_eq!(data_of(&events, 3), "o");
    assert_eq!(data_of(&events, 4), "r");
    assert_eq!(data_of(&events, 5), "l");
    assert_eq!(data_of(&events, 6), "d");
    assert_eq!(events[7], RecordedEvent::Complete);
}

/// S7: an application error mid-stream delivers exactly one NEXT and one
/// onError to the requester's sink, with no further frames observed.
#[tokio::test]
async fn application_error_mid_stream_is_terminal() {
    struct FailsAfterOne;
    impl RSocket for FailsAfterOne {
        fn metadata_push(&self, _metadata: Bytes) {}
        fn fire_and_forget(&self, _payload: Payload) {}
        fn request_response(&self, payload: Payload, mut downstream: Box<dyn Subscriber>) -> Box<dyn Subscriber> {
            downstream.on_next(payload, true);
            Box::new(NoopSubscriber)
        }
        fn request_stream(
            &self,
            _payload: Payload,
            _initial_request_n: u32,
            mut downstream: Box<dyn Subscriber>,
        ) -> Box<dyn Subscriber> {
            downstream.on_next(text("Hello"), false);
            downstream.on_error(RSocketError::WireError(
                ErrorCode::ApplicationError,
                "enough for today".to_owned(),
            ));
            Box::new(NoopSubscriber)
        }
        fn request_channel(
            &self,
            payload: Payload,
            _initial_request_n: u32,
            is_completed: bool,
            mut downstream: Box<dyn Subscriber>,
        ) -> Box<dyn Subscriber> {
            downstream.on_next(payload, is_completed);
            Box::new(NoopSubscriber)
        }
    }

    let (client_transport, server_transport) = channel_pair();
    let server = ServerBuilder::new(Arc::new(FailsAfterOne));
    let requester = ClientBuilder::new(client_transport).connect().await.unwrap();
    server.serve(server_transport).await.unwrap();

    let recorder = Recorder::new();
    let _handle = requester
        .request_stream(text("go"), rsocket_core::frame::REQUEST_MAX, Box::new(recorder.clone()))
        .await
        .unwrap();

    wait_for_events(&recorder, 2, Duration::from_millis(200)).await;
    let events = recorder.snapshot();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], RecordedEvent::Next(Some(b"Hello".to_vec()), false));
    match &events[1] {
        RecordedEvent::Error(message) => assert!(message.contains("enough for today")),
        other => panic!("expected Error, got {:?}", other),
    }
}
