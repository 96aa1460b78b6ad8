//! Server-side facade (component C6): accept one transport's SETUP
//! handshake and run its connection loop (spec §4.3).
//!
//! One `ServerBuilder` describes how every accepted connection should behave
//! (responder, accept gate, deferred initialization, concurrency cap);
//! listening on an actual socket and handing each accepted transport to
//! [`ServerBuilder::serve`] is the integrator's job (spec §1 Non-goals).

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::connection::{Connection, ServerConfig, SetupInfo, SetupOutcome};
use crate::error::RSocketResult;
use crate::rsocket::{RSocket, Requester};
use crate::transport::Transport;

pub struct ServerBuilder {
    config: ServerConfig,
}

impl ServerBuilder {
    pub fn new(responder: Arc<dyn RSocket>) -> ServerBuilder {
        ServerBuilder {
            config: ServerConfig::new(responder),
        }
    }

    /// Accept gate run against the peer's SETUP (spec §6 `shouldAcceptClient`).
    pub fn should_accept_client<F>(mut self, f: F) -> Self
    where
        F: Fn(&SetupInfo) -> SetupOutcome + Send + Sync + 'static,
    {
        self.config.should_accept_client = Box::new(f);
        self
    }

    /// Deferred post-accept initialization (spec §4.3 `initializeConnection`).
    /// Inbound frames arriving while this future is pending are buffered and
    /// replayed in order once it resolves.
    pub fn initialize_connection<F>(mut self, f: F) -> Self
    where
        F: Fn(&SetupInfo, Requester) -> BoxFuture<'static, RSocketResult<()>> + Send + Sync + 'static,
    {
        self.config.initialize_connection = Box::new(f);
        self
    }

    pub fn max_concurrent_streams(mut self, max: usize) -> Self {
        self.config.max_concurrent_streams = Some(max);
        self
    }

    /// Runs the SETUP handshake over `transport`, then spawns the connection
    /// loop on the current Tokio runtime and returns the requester facade
    /// for this accepted connection.
    pub async fn serve<T: Transport + 'static>(self, transport: T) -> RSocketResult<Requester> {
        let (connection, requester) = Connection::accept(transport, self.config).handshake().await?;
        tokio::spawn(async move {
            if let Err(e) = connection.run().await {
                log::warn!("server connection loop ended: {}", e);
            }
        });
        Ok(requester)
    }
}
