//! An in-process transport pair for end-to-end tests: two halves of an
//! unbounded channel, each implementing `rsocket_core::Transport` directly,
//! wired so one side's outbound frame is the other side's inbound one.

pub mod recorder;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Sink, Stream};
use tokio::sync::mpsc;

use rsocket_core::frame::Frame;
use rsocket_core::{RSocketError, Transport as _};

pub struct ChannelTransport {
    rx: mpsc::UnboundedReceiver<Frame>,
    tx: mpsc::UnboundedSender<Frame>,
}

pub fn channel_pair() -> (ChannelTransport, ChannelTransport) {
    let (tx_a, rx_b) = mpsc::unbounded_channel();
    let (tx_b, rx_a) = mpsc::unbounded_channel();
    (
        ChannelTransport { rx: rx_a, tx: tx_a },
        ChannelTransport { rx: rx_b, tx: tx_b },
    )
}

impl Stream for ChannelTransport {
    type Item = Result<Frame, RSocketError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|opt| opt.map(Ok))
    }
}

impl Sink<Frame> for ChannelTransport {
    type Error = RSocketError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        self.tx
            .send(item)
            .map_err(|_| RSocketError::Transport("peer dropped".into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

// Compile-time assertion that `ChannelTransport` satisfies the crate's
// transport contract.
fn _assert_transport<T: rsocket_core::Transport>() {}
#[allow(dead_code)]
fn _check() {
    _assert_transport::<ChannelTransport>();
}
