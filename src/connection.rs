//! Connection state machine (component C3): the SETUP handshake, the
//! keepalive loop, and connection-level close (spec §4.3).

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{ErrorCode, RSocketError, RSocketResult};
use crate::frame::{self, Body, Error as ErrorBody, Frame, Keepalive, MetadataPush, PayloadFrame, RequestChannel,
    RequestFNF, RequestN, RequestResponse, RequestStream, Setup};
use crate::mux::{self, Destination};
use crate::payload::Payload;
use crate::registry::{RouteOutcome, StreamRegistry};
use crate::rsocket::{Command, RSocket, Requester, WireSink};
use crate::stream_id::Role;
use crate::streams::{Incoming, Kind};
use crate::transport::Transport;

/// The handshake fields extracted from an inbound SETUP frame, handed to
/// `should_accept_client` (spec §4.3, §6 "SETUP configuration").
#[derive(Debug, Clone)]
pub struct SetupInfo {
    pub version: (u16, u16),
    pub keepalive_millis: u32,
    pub max_lifetime_millis: u32,
    pub metadata_mime_type: String,
    pub data_mime_type: String,
    pub honors_lease: bool,
    pub payload: Payload,
}

impl SetupInfo {
    fn from_setup(setup: &Setup) -> SetupInfo {
        SetupInfo {
            version: setup.version(),
            keepalive_millis: setup.keepalive_millis(),
            max_lifetime_millis: setup.max_lifetime_millis(),
            metadata_mime_type: setup.metadata_mime_type().to_owned(),
            data_mime_type: setup.data_mime_type().to_owned(),
            honors_lease: setup.honors_lease(),
            payload: setup.payload().clone(),
        }
    }
}

/// A server's verdict on an inbound SETUP (spec §4.3).
pub enum SetupOutcome {
    Accept,
    Reject(ErrorCode, String),
}

/// Server-side configuration: the accept gate and the deferred
/// initialization hook described in spec §4.3 and §6.
pub struct ServerConfig {
    pub responder: Arc<dyn RSocket>,
    pub should_accept_client: Box<dyn Fn(&SetupInfo) -> SetupOutcome + Send + Sync>,
    /// Mirrors the source's `initializeConnection(info, channel)`: runs after
    /// acceptance, before any buffered post-SETUP frame is replayed.
    pub initialize_connection:
        Box<dyn Fn(&SetupInfo, Requester) -> BoxFuture<'static, RSocketResult<()>> + Send + Sync>,
    pub max_concurrent_streams: Option<usize>,
}

impl ServerConfig {
    pub fn new(responder: Arc<dyn RSocket>) -> ServerConfig {
        ServerConfig {
            responder,
            should_accept_client: Box::new(|_| SetupOutcome::Accept),
            initialize_connection: Box::new(|_, _| Box::pin(async { Ok(()) })),
            max_concurrent_streams: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Establishing,
    Active,
    Closed,
}

/// Parameters a client dials SETUP with (spec §6).
pub struct SetupParams {
    pub keepalive_millis: u32,
    pub max_lifetime_millis: u32,
    pub metadata_mime_type: String,
    pub data_mime_type: String,
    pub honors_lease: bool,
    pub payload: Payload,
}

impl Default for SetupParams {
    fn default() -> SetupParams {
        SetupParams {
            keepalive_millis: 20_000,
            max_lifetime_millis: 90_000,
            metadata_mime_type: "application/octet-stream".to_owned(),
            data_mime_type: "application/octet-stream".to_owned(),
            honors_lease: false,
            payload: Payload::default(),
        }
    }
}

/// Reassembly state for a request-initiating frame that arrived with
/// `FOLLOWS` set: the responder can't be invoked until the whole logical
/// payload exists, so this lives outside the registry (which only ever
/// holds streams that already have a sink) until reassembly completes.
struct PendingInitiation {
    kind: Kind,
    initial_request_n: u32,
    is_completed: bool,
    payload: Payload,
}

/// Drives one RSocket connection end to end: reads frames off `transport`,
/// advances the handshake/keepalive/registry state, and writes frames back.
/// Owns the registry exclusively, per spec §3 "Ownership" and §5's
/// single-threaded cooperative model.
pub struct Connection<T: Transport> {
    transport: T,
    role: Role,
    state: State,
    registry: StreamRegistry,
    responder: Arc<dyn RSocket>,
    keepalive_interval: Duration,
    max_lifetime: Duration,
    last_inbound_at: Instant,
    commands_tx: mpsc::UnboundedSender<Command>,
    commands_rx: mpsc::UnboundedReceiver<Command>,
    pending_initiations: HashMap<u32, PendingInitiation>,
    setup_buffer: VecDeque<Frame>,
    establishing: bool,
    establish_fut: Pin<Box<dyn Future<Output = RSocketResult<()>> + Send>>,
}

fn ready_ok() -> Pin<Box<dyn Future<Output = RSocketResult<()>> + Send>> {
    Box::pin(async { Ok(()) })
}

impl<T: Transport + 'static> Connection<T> {
    /// Client path: SETUP is sent immediately and the connection becomes
    /// `Active` optimistically (spec §4.3) — rejection arrives later as an
    /// `ERROR` on stream 0 and is surfaced through `run`'s return value.
    pub async fn connect(
        mut transport: T,
        setup: SetupParams,
        responder: Arc<dyn RSocket>,
    ) -> RSocketResult<(Connection<T>, Requester)> {
        let frame = Setup::builder(setup.keepalive_millis, setup.max_lifetime_millis)
            .set_metadata_mime_type(&setup.metadata_mime_type)
            .set_data_mime_type(&setup.data_mime_type)
            .set_honors_lease(setup.honors_lease)
            .set_payload(setup.payload)
            .build_frame();
        transport
            .send(frame)
            .await
            .map_err(|e| RSocketError::Transport(e.to_string()))?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let requester = Requester::new(commands_tx.clone());
        let connection = Connection {
            transport,
            role: Role::Client,
            state: State::Active,
            registry: StreamRegistry::new(Role::Client, None),
            responder,
            keepalive_interval: Duration::from_millis(setup.keepalive_millis as u64),
            max_lifetime: Duration::from_millis(setup.max_lifetime_millis as u64),
            last_inbound_at: Instant::now(),
            commands_tx,
            commands_rx,
            pending_initiations: HashMap::new(),
            setup_buffer: VecDeque::new(),
            establishing: false,
            establish_fut: ready_ok(),
        };
        Ok((connection, requester))
    }

    /// Server path: waits for the client's first frame (expected to be
    /// SETUP) and runs the accept gate, per spec §4.3's `AwaitingSetup`.
    pub fn accept(transport: T, config: ServerConfig) -> ServerHandshakeDriver<T> {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let connection = Connection {
            transport,
            role: Role::Server,
            state: State::Establishing,
            registry: StreamRegistry::new(Role::Server, config.max_concurrent_streams),
            responder: config.responder,
            keepalive_interval: Duration::from_secs(20),
            max_lifetime: Duration::from_secs(90),
            last_inbound_at: Instant::now(),
            commands_tx,
            commands_rx,
            pending_initiations: HashMap::new(),
            setup_buffer: VecDeque::new(),
            establishing: false,
            establish_fut: ready_ok(),
        };
        ServerHandshakeDriver {
            connection,
            should_accept_client: config.should_accept_client,
            initialize_connection: config.initialize_connection,
        }
    }

    /// Runs the connection loop until it closes. Mirrors spec §5's single
    /// select loop: inbound frames, submitted commands, the deferred
    /// `initializeConnection` future and the keepalive ticker are all
    /// serviced on one task.
    pub async fn run(mut self) -> RSocketResult<()> {
        let mut ticker = tokio::time::interval(self.keepalive_interval);
        loop {
            if self.state == State::Closed {
                return Ok(());
            }
            tokio::select! {
                frame = self.transport.next() => {
                    match frame {
                        Some(Ok(frame)) => {
                            self.last_inbound_at = Instant::now();
                            self.on_inbound_frame(frame).await?;
                        }
                        Some(Err(e)) => {
                            warn!("transport read error: {}", e);
                            self.close(ErrorCode::ConnectionError, "transport error").await?;
                        }
                        None => {
                            debug!("transport closed by peer");
                            self.state = State::Closed;
                            self.fan_out_connection_error("transport closed");
                        }
                    }
                }
                command = self.commands_rx.recv() => {
                    if let Some(command) = command {
                        self.on_command(command).await?;
                    }
                    // `None`: every handle was dropped; inbound traffic may continue.
                }
                result = &mut self.establish_fut, if self.establishing => {
                    self.establishing = false;
                    self.finish_establishing(result).await?;
                }
                _ = ticker.tick() => {
                    self.on_keepalive_tick().await?;
                }
            }
            if self.state != State::Closed
                && Instant::now().saturating_duration_since(self.last_inbound_at) > self.max_lifetime
            {
                self.close(ErrorCode::ConnectionError, "max lifetime exceeded").await?;
            }
        }
    }

    async fn on_inbound_frame(&mut self, frame: Frame) -> RSocketResult<()> {
        if self.establishing {
            trace!("buffering frame during setup window: stream {}", frame.stream_id());
            self.setup_buffer.push_back(frame);
            return Ok(());
        }
        self.dispatch(frame).await
    }

    async fn dispatch(&mut self, frame: Frame) -> RSocketResult<()> {
        match mux::demux(frame) {
            Destination::Connection(frame) => self.on_connection_frame(frame).await,
            Destination::Stream(stream_id, frame) => self.on_stream_frame(stream_id, frame).await,
        }
    }

    async fn on_connection_frame(&mut self, frame: Frame) -> RSocketResult<()> {
        // KEEPALIVE reuses FLAG_FOLLOW's bit as RESPOND; capture it before
        // `into_body` discards the header.
        let respond = frame.has_follows();
        match frame.into_body() {
            Body::Keepalive(k) => {
                self.handle_keepalive(respond, k.last_received_position(), k.data().clone()).await
            }
            Body::Error(e) => {
                warn!("connection-level error from peer: {}", e.message());
                self.state = State::Closed;
                self.fan_out_connection_error(&e.message());
                Ok(())
            }
            Body::MetadataPush(m) => {
                if let Some(metadata) = m.metadata() {
                    self.responder.metadata_push(metadata.clone());
                }
                Ok(())
            }
            // SETUP past the handshake window, and RESUME*/LEASE beyond
            // codec support, are accepted but otherwise inert (spec §2
            // "supplemented features": wire format only).
            Body::Lease(_) | Body::Resume(_) | Body::ResumeOK(_) | Body::Setup(_) => Ok(()),
            _ => Ok(()),
        }
    }

    async fn handle_keepalive(
        &mut self,
        respond: bool,
        position: u64,
        data: Option<Bytes>,
    ) -> RSocketResult<()> {
        if respond {
            let reply = Keepalive::build_frame(false, position, data);
            self.write_frame(reply).await?;
        }
        Ok(())
    }

    async fn on_stream_frame(&mut self, stream_id: u32, frame: Frame) -> RSocketResult<()> {
        if self.registry.get(stream_id).is_some() {
            return match self.registry.route_inbound(stream_id, frame) {
                RouteOutcome::Handled(outgoing) => self.write_frames(outgoing).await,
                RouteOutcome::NotFound(_) => Ok(()),
            };
        }
        if self.pending_initiations.contains_key(&stream_id) {
            return self.continue_pending_initiation(stream_id, frame).await;
        }
        if frame::is_request_initiation(frame.frame_type()) {
            // `is_own_parity` answers "would this role mint this id" (stream_id.rs
            // module doc); a legitimate inbound request always bears the *peer's*
            // parity, so it's illegal only when it matches our own.
            if self.registry.is_own_parity(stream_id) {
                let reply = ErrorBody::build_frame(
                    stream_id,
                    ErrorCode::Rejected.as_u32(),
                    "stream id parity mismatch",
                );
                return self.write_frame(reply).await;
            }
            if self.registry.is_over_capacity() {
                let reply = ErrorBody::build_frame(
                    stream_id,
                    ErrorCode::Rejected.as_u32(),
                    "too many concurrent streams",
                );
                return self.write_frame(reply).await;
            }
            return self.begin_new_stream(stream_id, frame).await;
        }
        trace!("late frame for unknown stream {}: type {}", stream_id, frame.frame_type());
        Ok(())
    }

    async fn begin_new_stream(&mut self, stream_id: u32, frame: Frame) -> RSocketResult<()> {
        let has_complete = frame.has_complete();
        let has_follows = frame.has_follows();
        match frame.into_body() {
            Body::RequestResponse(r) => {
                self.start_or_finish_initiation(
                    stream_id,
                    Kind::RequestResponse,
                    0,
                    has_complete,
                    has_follows,
                    r.into_payload(),
                )
                .await
            }
            Body::RequestStream(r) => {
                let n = r.initial_request_n();
                self.start_or_finish_initiation(
                    stream_id,
                    Kind::RequestStream,
                    n,
                    has_complete,
                    has_follows,
                    r.into_payload(),
                )
                .await
            }
            Body::RequestChannel(r) => {
                let n = r.initial_request_n();
                self.start_or_finish_initiation(
                    stream_id,
                    Kind::RequestChannel,
                    n,
                    has_complete,
                    has_follows,
                    r.into_payload(),
                )
                .await
            }
            Body::RequestFNF(r) => {
                self.start_or_finish_initiation(
                    stream_id,
                    Kind::FireAndForget,
                    0,
                    true,
                    has_follows,
                    r.into_payload(),
                )
                .await
            }
            _ => Ok(()),
        }
    }

    async fn start_or_finish_initiation(
        &mut self,
        stream_id: u32,
        kind: Kind,
        initial_request_n: u32,
        is_completed: bool,
        has_follows: bool,
        payload: Payload,
    ) -> RSocketResult<()> {
        if has_follows {
            self.pending_initiations.insert(
                stream_id,
                PendingInitiation {
                    kind,
                    initial_request_n,
                    is_completed,
                    payload,
                },
            );
            return Ok(());
        }
        self.invoke_responder(stream_id, kind, initial_request_n, is_completed, payload).await
    }

    async fn continue_pending_initiation(&mut self, stream_id: u32, frame: Frame) -> RSocketResult<()> {
        let has_follows = frame.has_follows();
        let event = Incoming::from_frame(frame);
        let (fragment_payload, is_completed) = match event {
            Incoming::Payload { payload, has_complete, .. } => (payload, has_complete),
            // a control frame mid-reassembly of a request initiation is
            // nonsensical on the wire; drop it as a late frame.
            _ => return Ok(()),
        };
        {
            let pending = self
                .pending_initiations
                .get_mut(&stream_id)
                .expect("checked contains_key before calling");
            pending.payload.append_fragment(fragment_payload);
            pending.is_completed = is_completed;
        }
        if has_follows {
            return Ok(());
        }
        let pending = self.pending_initiations.remove(&stream_id).unwrap();
        self.invoke_responder(stream_id, pending.kind, pending.initial_request_n, pending.is_completed, pending.payload)
            .await
    }

    /// Invokes the application responder now that a complete logical
    /// request payload exists, and registers the stream under the epoch
    /// the returned sink was tagged with.
    async fn invoke_responder(
        &mut self,
        stream_id: u32,
        kind: Kind,
        initial_request_n: u32,
        is_completed: bool,
        payload: Payload,
    ) -> RSocketResult<()> {
        if kind == Kind::FireAndForget {
            self.responder.fire_and_forget(payload);
            return Ok(());
        }
        let epoch = self.registry.mint_epoch();
        let downstream = WireSink::new(stream_id, epoch, self.commands_tx.clone());
        let upstream = match kind {
            Kind::RequestResponse => self.responder.request_response(payload, Box::new(downstream)),
            Kind::RequestStream => {
                self.responder.request_stream(payload, initial_request_n, Box::new(downstream))
            }
            Kind::RequestChannel => self.responder.request_channel(
                payload,
                initial_request_n,
                is_completed,
                Box::new(downstream),
            ),
            Kind::FireAndForget => unreachable!(),
        };
        self.registry.insert_with_epoch(stream_id, kind, epoch, upstream);
        if initial_request_n > 0 {
            if let Some(entry) = self.registry.get_mut(stream_id) {
                entry.grant_demand(initial_request_n);
            }
        }
        match kind {
            // the single initiating frame is the whole of the remote half
            // for RR/RS (spec §4.5 "Responder: mirror").
            Kind::RequestResponse | Kind::RequestStream => {
                self.registry.close_remote_half(stream_id, epoch);
            }
            Kind::RequestChannel if is_completed => {
                self.registry.close_remote_half(stream_id, epoch);
            }
            _ => (),
        }
        Ok(())
    }

    /// Services one command submitted through the explicit channel crossing
    /// described in spec §5 — either a sink call translated to a wire frame,
    /// or a fresh requester-initiated stream registration.
    async fn on_command(&mut self, command: Command) -> RSocketResult<()> {
        match command {
            Command::SinkNext { stream_id, epoch, payload, is_completion } => {
                self.emit_sink_next(stream_id, epoch, payload, is_completion).await
            }
            Command::SinkComplete { stream_id, epoch } => self.emit_sink_complete(stream_id, epoch).await,
            Command::SinkError { stream_id, epoch, code, message } => {
                self.emit_sink_error(stream_id, epoch, code, message).await
            }
            Command::SinkCancel { stream_id, epoch } => self.emit_sink_cancel(stream_id, epoch).await,
            Command::SinkRequestN { stream_id, epoch, n } => self.emit_sink_request_n(stream_id, epoch, n).await,
            Command::FireAndForget { payload } => {
                let stream_id = self.registry.allocate_id()?;
                self.write_frame(RequestFNF::build_frame(stream_id, payload)).await
            }
            Command::MetadataPush { metadata } => self.write_frame(MetadataPush::build_frame(metadata)).await,
            Command::RegisterRequestResponse { payload, downstream, reply } => {
                self.register_requester_stream(Kind::RequestResponse, payload, 0, false, downstream, reply).await
            }
            Command::RegisterRequestStream { payload, initial_request_n, downstream, reply } => {
                self.register_requester_stream(Kind::RequestStream, payload, initial_request_n, false, downstream, reply)
                    .await
            }
            Command::RegisterRequestChannel { payload, initial_request_n, is_completed, downstream, reply } => {
                self.register_requester_stream(
                    Kind::RequestChannel,
                    payload,
                    initial_request_n,
                    is_completed,
                    downstream,
                    reply,
                )
                .await
            }
        }
    }

    async fn register_requester_stream(
        &mut self,
        kind: Kind,
        payload: Payload,
        initial_request_n: u32,
        is_completed: bool,
        downstream: Box<dyn crate::sink::Subscriber>,
        reply: tokio::sync::oneshot::Sender<RSocketResult<(u32, u64)>>,
    ) -> RSocketResult<()> {
        let stream_id = match self.registry.allocate_id() {
            Ok(id) => id,
            Err(e) => {
                let _ = reply.send(Err(e));
                return Ok(());
            }
        };
        let epoch = self.registry.insert(stream_id, kind, downstream);
        // A channel is bidirectional but `REQUEST_CHANNEL` carries a single
        // `initialRequestN` field (spec §3 "inboundDemand ... granted via ...
        // initial requestN"); the initiator's own sends need a starting credit
        // just as much as the responder's do, so both entries seed from it.
        if kind == Kind::RequestChannel && initial_request_n > 0 {
            if let Some(entry) = self.registry.get_mut(stream_id) {
                entry.grant_demand(initial_request_n);
            }
        }
        let frame = match kind {
            Kind::RequestResponse => RequestResponse::build_frame(stream_id, payload),
            Kind::RequestStream => RequestStream::build_frame(stream_id, initial_request_n, payload),
            Kind::RequestChannel => {
                RequestChannel::build_frame(stream_id, initial_request_n, payload, is_completed)
            }
            Kind::FireAndForget => RequestFNF::build_frame(stream_id, payload),
        };
        let _ = reply.send(Ok((stream_id, epoch)));
        self.write_frame(frame).await
    }

    async fn emit_sink_next(
        &mut self,
        stream_id: u32,
        epoch: u64,
        payload: Payload,
        is_completion: bool,
    ) -> RSocketResult<()> {
        if !self.registry.epoch_matches(stream_id, epoch) {
            return Ok(());
        }
        // request/response's single reply is never flow-controlled; every
        // other kind's NEXT consumes granted demand (spec §4.5, §8 property 3).
        let is_request_response = self.registry.get(stream_id).map_or(false, |e| e.kind == Kind::RequestResponse);
        let allowed = if is_request_response {
            true
        } else {
            self.registry.get_mut(stream_id).map_or(false, |e| e.take_demand())
        };
        if !allowed {
            warn!("dropping NEXT on stream {} with no remaining demand", stream_id);
            return Ok(());
        }
        let frame = PayloadFrame::build_frame(stream_id, payload, true, is_completion);
        self.write_frame(frame).await?;
        if is_completion {
            self.registry.close_local_half(stream_id, epoch);
        }
        Ok(())
    }

    async fn emit_sink_complete(&mut self, stream_id: u32, epoch: u64) -> RSocketResult<()> {
        if !self.registry.epoch_matches(stream_id, epoch) {
            return Ok(());
        }
        self.registry.close_local_half(stream_id, epoch);
        let frame = PayloadFrame::build_frame(stream_id, Payload::default(), false, true);
        self.write_frame(frame).await
    }

    async fn emit_sink_error(&mut self, stream_id: u32, epoch: u64, code: u32, message: String) -> RSocketResult<()> {
        if !self.registry.epoch_matches(stream_id, epoch) {
            return Ok(());
        }
        self.registry.remove(stream_id, epoch);
        let frame = ErrorBody::build_frame(stream_id, code, &message);
        self.write_frame(frame).await
    }

    async fn emit_sink_cancel(&mut self, stream_id: u32, epoch: u64) -> RSocketResult<()> {
        if !self.registry.epoch_matches(stream_id, epoch) {
            return Ok(());
        }
        self.registry.remove(stream_id, epoch);
        self.write_frame(Frame::new(stream_id, Body::Cancel, 0)).await
    }

    async fn emit_sink_request_n(&mut self, stream_id: u32, epoch: u64, n: u32) -> RSocketResult<()> {
        if !self.registry.epoch_matches(stream_id, epoch) {
            return Ok(());
        }
        self.write_frame(RequestN::build_frame(stream_id, n)).await
    }

    async fn on_keepalive_tick(&mut self) -> RSocketResult<()> {
        if self.state != State::Active {
            return Ok(());
        }
        let frame = Keepalive::build_frame(true, 0, None);
        self.write_frame(frame).await
    }

    async fn finish_establishing(&mut self, result: RSocketResult<()>) -> RSocketResult<()> {
        match result {
            Ok(()) => {
                self.state = State::Active;
                let buffered: Vec<Frame> = self.setup_buffer.drain(..).collect();
                for frame in buffered {
                    self.dispatch(frame).await?;
                }
                Ok(())
            }
            Err(e) => {
                warn!("initializeConnection failed: {}", e);
                self.close(ErrorCode::ConnectionError, "initialization failed").await
            }
        }
    }

    async fn write_frame(&mut self, frame: Frame) -> RSocketResult<()> {
        self.transport
            .send(frame)
            .await
            .map_err(|e| RSocketError::Transport(e.to_string()))
    }

    async fn write_frames(&mut self, frames: Vec<Frame>) -> RSocketResult<()> {
        for frame in frames {
            self.write_frame(frame).await?;
        }
        Ok(())
    }

    /// Connection-level close (spec §4.3): an `ERROR` describing the cause
    /// goes out on stream 0, then every live stream gets a synthetic
    /// `onError` (spec §7 "Connection errors").
    async fn close(&mut self, code: ErrorCode, reason: &str) -> RSocketResult<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        self.state = State::Closed;
        let frame = ErrorBody::build_frame(0, code.as_u32(), reason);
        let _ = self.write_frame(frame).await;
        self.fan_out_connection_error(reason);
        Ok(())
    }

    fn fan_out_connection_error(&mut self, reason: &str) {
        for (stream_id, mut entry) in self.registry.drain() {
            trace!("synthetic connection error delivered to stream {}", stream_id);
            entry
                .sink
                .on_error(RSocketError::WireError(ErrorCode::ConnectionError, reason.to_owned()));
        }
    }
}

/// Awaits the server's first frame (expected to be SETUP), runs the accept
/// gate, then hands back a `Connection` ready for `run` plus the requester
/// facade — spec §4.3's `AwaitingSetup` step, before `run`'s own
/// `Establishing → Active` replay takes over.
pub struct ServerHandshakeDriver<T: Transport> {
    connection: Connection<T>,
    should_accept_client: Box<dyn Fn(&SetupInfo) -> SetupOutcome + Send + Sync>,
    initialize_connection:
        Box<dyn Fn(&SetupInfo, Requester) -> BoxFuture<'static, RSocketResult<()>> + Send + Sync>,
}

impl<T: Transport + 'static> ServerHandshakeDriver<T> {
    pub async fn handshake(mut self) -> RSocketResult<(Connection<T>, Requester)> {
        let frame = self
            .connection
            .transport
            .next()
            .await
            .ok_or_else(|| RSocketError::Transport("connection closed before SETUP".into()))?
            .map_err(|e| RSocketError::Transport(e.to_string()))?;
        self.connection.last_inbound_at = Instant::now();
        if frame.stream_id() != 0 || frame.frame_type() != frame::TYPE_SETUP {
            let reply = ErrorBody::build_frame(0, ErrorCode::InvalidSetup.as_u32(), "expected SETUP");
            self.connection.write_frame(reply).await?;
            return Err(RSocketError::WireError(
                ErrorCode::InvalidSetup,
                "expected SETUP as first frame".into(),
            ));
        }
        let setup = match frame.into_body() {
            Body::Setup(s) => s,
            _ => unreachable!("frame_type already checked"),
        };
        let info = SetupInfo::from_setup(&setup);
        self.connection.keepalive_interval = Duration::from_millis(info.keepalive_millis as u64);
        self.connection.max_lifetime = Duration::from_millis(info.max_lifetime_millis as u64);

        match (self.should_accept_client)(&info) {
            SetupOutcome::Reject(code, message) => {
                let reply = ErrorBody::build_frame(0, code.as_u32(), &message);
                self.connection.write_frame(reply).await?;
                Err(RSocketError::WireError(code, message))
            }
            SetupOutcome::Accept => {
                let requester = Requester::new(self.connection.commands_tx.clone());
                self.connection.establish_fut = (self.initialize_connection)(&info, requester.clone());
                self.connection.establishing = true;
                Ok((self.connection, requester))
            }
        }
    }
}
