//! The shared requester/responder capability surface (spec §9 Design Notes:
//! "re-architect the four interaction models as a single capability set"
//! rather than bespoke per-kind client objects).
//!
//! One `RSocket` implementation plays both roles, just wired up from
//! opposite directions by the connection:
//!
//! * As a **requester**, the application calls [`Requester`]'s methods. Each
//!   one mints a stream id, registers the caller's `downstream` sink in the
//!   registry so inbound `PAYLOAD`/`ERROR`/`CANCEL` frames reach it, emits the
//!   initiating frame, and returns a [`WireSink`] (aliased as
//!   [`OutboundHandle`]) the caller uses to send `CANCEL`/`REQUEST_N`/further
//!   channel payloads.
//! * As a **responder**, the connection calls the application-supplied
//!   `RSocket` impl's methods directly from the connection loop when an
//!   inbound request-initiating frame creates a new stream, handing it a
//!   `WireSink` as `downstream` (so the responder's own `on_next`/
//!   `on_complete`/`on_error` calls become outbound `PAYLOAD`/`ERROR` frames)
//!   and storing whatever `Box<dyn Subscriber>` it returns as the stream
//!   entry's sink, so that later inbound `CANCEL`/`REQUEST_N` (and, for
//!   channels, `PAYLOAD`) frames reach the responder.
//!
//! `WireSink` is this crate's "explicit submit primitive" (spec §5): the only
//! way a call originating off the connection's own task reaches the loop.

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::{ErrorCode, RSocketError, RSocketResult};
use crate::payload::Payload;
use crate::sink::{NoopSubscriber, Subscriber};

/// Everything the connection loop does on behalf of a sink call or a fresh
/// requester-initiated stream, submitted across the explicit channel
/// boundary described in spec §5.
pub enum Command {
    SinkNext {
        stream_id: u32,
        epoch: u64,
        payload: Payload,
        is_completion: bool,
    },
    SinkComplete {
        stream_id: u32,
        epoch: u64,
    },
    SinkError {
        stream_id: u32,
        epoch: u64,
        code: u32,
        message: String,
    },
    SinkCancel {
        stream_id: u32,
        epoch: u64,
    },
    SinkRequestN {
        stream_id: u32,
        epoch: u64,
        n: u32,
    },
    FireAndForget {
        payload: Payload,
    },
    MetadataPush {
        metadata: Bytes,
    },
    RegisterRequestResponse {
        payload: Payload,
        downstream: Box<dyn Subscriber>,
        reply: oneshot::Sender<RSocketResult<(u32, u64)>>,
    },
    RegisterRequestStream {
        payload: Payload,
        initial_request_n: u32,
        downstream: Box<dyn Subscriber>,
        reply: oneshot::Sender<RSocketResult<(u32, u64)>>,
    },
    RegisterRequestChannel {
        payload: Payload,
        initial_request_n: u32,
        is_completed: bool,
        downstream: Box<dyn Subscriber>,
        reply: oneshot::Sender<RSocketResult<(u32, u64)>>,
    },
}

/// The capability surface implemented by an application-supplied responder
/// (spec §9). Runs synchronously on the connection loop: an inbound
/// request-initiating frame calls straight into it, so an implementation
/// that needs to do real work should hand off to its own task and drive
/// `downstream` from there, forwarding the returned handle's later calls.
pub trait RSocket: Send + Sync {
    fn metadata_push(&self, metadata: Bytes);

    fn fire_and_forget(&self, payload: Payload);

    fn request_response(
        &self,
        payload: Payload,
        downstream: Box<dyn Subscriber>,
    ) -> Box<dyn Subscriber>;

    fn request_stream(
        &self,
        payload: Payload,
        initial_request_n: u32,
        downstream: Box<dyn Subscriber>,
    ) -> Box<dyn Subscriber>;

    fn request_channel(
        &self,
        payload: Payload,
        initial_request_n: u32,
        is_completed: bool,
        downstream: Box<dyn Subscriber>,
    ) -> Box<dyn Subscriber>;
}

/// A sink that turns every call into an outbound wire frame for one stream,
/// submitted through the connection's command channel. Used both as the
/// `downstream` handed to a responder and as the handle returned to a
/// requester (spec §9).
#[derive(Clone)]
pub struct WireSink {
    stream_id: u32,
    epoch: u64,
    commands: tokio::sync::mpsc::UnboundedSender<Command>,
}

/// Public name for the handle a requester gets back (spec §3 "OutboundHandle").
pub type OutboundHandle = WireSink;

impl WireSink {
    pub(crate) fn new(
        stream_id: u32,
        epoch: u64,
        commands: tokio::sync::mpsc::UnboundedSender<Command>,
    ) -> WireSink {
        WireSink {
            stream_id,
            epoch,
            commands,
        }
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    fn send(&self, command: Command) {
        // A closed connection loop means the receiving half dropped; there's
        // nothing left to submit to, and no caller left to report it to
        // either, so this is silently a no-op rather than a panic.
        let _ = self.commands.send(command);
    }

    pub fn cancel(&self) {
        self.send(Command::SinkCancel {
            stream_id: self.stream_id,
            epoch: self.epoch,
        });
    }

    pub fn request_n(&self, n: u32) {
        if n == 0 {
            return;
        }
        self.send(Command::SinkRequestN {
            stream_id: self.stream_id,
            epoch: self.epoch,
            n,
        });
    }
}

impl Subscriber for WireSink {
    fn on_next(&mut self, payload: Payload, is_completion: bool) {
        self.send(Command::SinkNext {
            stream_id: self.stream_id,
            epoch: self.epoch,
            payload,
            is_completion,
        });
    }

    fn on_complete(&mut self) {
        self.send(Command::SinkComplete {
            stream_id: self.stream_id,
            epoch: self.epoch,
        });
    }

    fn on_error(&mut self, error: RSocketError) {
        let (code, message) = match error {
            RSocketError::WireError(code, message) => (code.as_u32(), message),
            other => (ErrorCode::ApplicationError.as_u32(), other.to_string()),
        };
        self.send(Command::SinkError {
            stream_id: self.stream_id,
            epoch: self.epoch,
            code,
            message,
        });
    }

    fn on_cancel(&mut self) {
        self.cancel();
    }

    fn on_request_n(&mut self, n: u32) {
        self.request_n(n);
    }
}

/// The requester-side facade handed to application code once a connection
/// reaches `Active` (spec §4.3). Cloneable and `Send`; every method is safe
/// to call from any task, not just the connection's own.
#[derive(Clone)]
pub struct Requester {
    commands: tokio::sync::mpsc::UnboundedSender<Command>,
}

impl Requester {
    pub(crate) fn new(commands: tokio::sync::mpsc::UnboundedSender<Command>) -> Requester {
        Requester { commands }
    }

    pub fn metadata_push(&self, metadata: Bytes) {
        let _ = self.commands.send(Command::MetadataPush { metadata });
    }

    pub fn fire_and_forget(&self, payload: Payload) {
        let _ = self.commands.send(Command::FireAndForget { payload });
    }

    pub async fn request_response(
        &self,
        payload: Payload,
        downstream: Box<dyn Subscriber>,
    ) -> RSocketResult<OutboundHandle> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::RegisterRequestResponse {
                payload,
                downstream,
                reply,
            })
            .map_err(|_| RSocketError::Transport("connection closed".into()))?;
        self.await_registration(reply_rx).await
    }

    pub async fn request_stream(
        &self,
        payload: Payload,
        initial_request_n: u32,
        downstream: Box<dyn Subscriber>,
    ) -> RSocketResult<OutboundHandle> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::RegisterRequestStream {
                payload,
                initial_request_n,
                downstream,
                reply,
            })
            .map_err(|_| RSocketError::Transport("connection closed".into()))?;
        self.await_registration(reply_rx).await
    }

    pub async fn request_channel(
        &self,
        payload: Payload,
        initial_request_n: u32,
        is_completed: bool,
        downstream: Box<dyn Subscriber>,
    ) -> RSocketResult<OutboundHandle> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::RegisterRequestChannel {
                payload,
                initial_request_n,
                is_completed,
                downstream,
                reply,
            })
            .map_err(|_| RSocketError::Transport("connection closed".into()))?;
        self.await_registration(reply_rx).await
    }

    async fn await_registration(
        &self,
        reply_rx: oneshot::Receiver<RSocketResult<(u32, u64)>>,
    ) -> RSocketResult<OutboundHandle> {
        let (stream_id, epoch) = reply_rx
            .await
            .map_err(|_| RSocketError::Transport("connection closed".into()))??;
        Ok(WireSink::new(stream_id, epoch, self.commands.clone()))
    }
}

/// A trivial responder that echoes every request's payload straight back
/// (request/response and request/stream each emit it once; request/channel
/// mirrors whatever the requester sends). Useful for demos and tests, not
/// meant for production use.
pub struct EchoRSocket;

impl RSocket for EchoRSocket {
    fn metadata_push(&self, _metadata: Bytes) {}

    fn fire_and_forget(&self, _payload: Payload) {}

    fn request_response(
        &self,
        payload: Payload,
        mut downstream: Box<dyn Subscriber>,
    ) -> Box<dyn Subscriber> {
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
        Box::new(NoopSubscriber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_responds_to_request_response() {
        use crate::sink::tests::RecordingSubscriber;
        let echo = EchoRSocket;
        let recorder = RecordingSubscriber::new();
        let events = recorder.events.clone();
        let payload = Payload::builder().set_data_utf8("ping").build();
        let _ = echo.request_response(payload, Box::new(recorder));
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
    }
}
