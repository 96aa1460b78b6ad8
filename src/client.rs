//! Client-side facade (component C6): dial a transport, run the SETUP
//! handshake optimistically, and hand back a requester once the connection
//! loop is spawned (spec §4.3, §6 `connectedPromise`).

use std::sync::Arc;

use crate::connection::{Connection, SetupParams};
use crate::error::RSocketResult;
use crate::payload::Payload;
use crate::rsocket::{EchoRSocket, RSocket, Requester};
use crate::transport::Transport;

/// Builds a client connection's SETUP parameters and acting responder before
/// dialing. Mirrors the way `SetupBuilder` composes a SETUP frame, one level
/// up.
pub struct ClientBuilder<T: Transport> {
    transport: T,
    setup: SetupParams,
    responder: Arc<dyn RSocket>,
}

impl<T: Transport + 'static> ClientBuilder<T> {
    pub fn new(transport: T) -> ClientBuilder<T> {
        ClientBuilder {
            transport,
            setup: SetupParams::default(),
            responder: Arc::new(EchoRSocket),
        }
    }

    pub fn keepalive_millis(mut self, millis: u32) -> Self {
        self.setup.keepalive_millis = millis;
        self
    }

    pub fn max_lifetime_millis(mut self, millis: u32) -> Self {
        self.setup.max_lifetime_millis = millis;
        self
    }

    pub fn metadata_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.setup.metadata_mime_type = mime.into();
        self
    }

    pub fn data_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.setup.data_mime_type = mime.into();
        self
    }

    pub fn setup_payload(mut self, payload: Payload) -> Self {
        self.setup.payload = payload;
        self
    }

    /// Sets the `RSocket` this end plays as responder to the peer's
    /// requests. Defaults to [`EchoRSocket`] for clients that never expect
    /// inbound requests.
    pub fn acceptor(mut self, responder: Arc<dyn RSocket>) -> Self {
        self.responder = responder;
        self
    }

    /// Sends SETUP, spawns the connection loop on the current Tokio runtime,
    /// and returns the requester facade. Resolves once SETUP is written —
    /// rejection, if any, arrives later as a connection-level ERROR and is
    /// only observable through the requester's calls starting to fail.
    pub async fn connect(self) -> RSocketResult<Requester> {
        let (connection, requester) = Connection::connect(self.transport, self.setup, self.responder).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.run().await {
                log::warn!("client connection loop ended: {}", e);
            }
        });
        Ok(requester)
    }
}
