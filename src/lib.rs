//! `rsocket-core`: a from-scratch implementation of the RSocket application
//! protocol's hard core — frame codec, demultiplexer, connection state
//! machine, stream registry, per-stream state machines, and the
//! requester/responder facades built on top of them.
//!
//! A 24-bit length-prefixed TCP transport, TLS, and connection pooling are
//! left to integrators; this crate only needs something implementing
//! [`transport::Transport`] — whole [`frame::Frame`]s in, whole `Frame`s out.

pub mod client;
pub mod connection;
pub mod error;
pub mod frame;
pub mod mux;
pub mod payload;
pub mod registry;
pub mod rsocket;
pub mod server;
pub mod sink;
pub mod stream_id;
pub mod streams;
pub mod transport;

pub use client::ClientBuilder;
pub use connection::{Connection, ServerConfig, SetupInfo, SetupOutcome, SetupParams};
pub use error::{ErrorCode, RSocketError, RSocketResult};
pub use payload::Payload;
pub use rsocket::{EchoRSocket, OutboundHandle, RSocket, Requester};
pub use server::ServerBuilder;
pub use sink::Subscriber;
pub use transport::Transport;
