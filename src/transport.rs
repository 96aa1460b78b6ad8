//! The transport contract (spec §6): a full-duplex, reliable byte stream
//! that already delivers whole frames — the 24-bit length-prefix framing
//! used over TCP is the integrator's job, not this crate's (spec §1
//! Non-goals). The connection only ever sees `Frame`s in and `Frame`s out.

use bytes::BytesMut;
use futures::{Sink, Stream};

use crate::error::RSocketError;
use crate::frame::Frame;

/// Anything that can hand the connection whole, already length-delimited
/// frame bodies and accept whole frame bodies to send, is a transport.
///
/// A TCP integrator satisfies this by layering a 24-bit big-endian
/// length-field framer (`crate::transport::LengthPrefixedFramer` is a
/// minimal reference one) over the raw socket; a test or an in-process
/// transport can just hand `Frame`s directly through a channel.
pub trait Transport:
    Stream<Item = Result<Frame, RSocketError>> + Sink<Frame, Error = RSocketError> + Send + Unpin
{
}

impl<T> Transport for T where
    T: Stream<Item = Result<Frame, RSocketError>> + Sink<Frame, Error = RSocketError> + Send + Unpin
{
}

/// Strips/applies the 3-byte big-endian length prefix TCP transports use
/// ahead of each frame (spec §6). Provided as a convenience; integrators
/// using a different transport (e.g. a message-oriented websocket) don't
/// need it at all, since their transport already delivers whole frames.
pub fn decode_length_prefixed(buf: &mut BytesMut) -> Option<BytesMut> {
    if buf.len() < 3 {
        return None;
    }
    let len = ((buf[0] as usize) << 16) | ((buf[1] as usize) << 8) | (buf[2] as usize);
    if buf.len() < 3 + len {
        return None;
    }
    buf.advance(3);
    Some(buf.split_to(len))
}

pub fn encode_length_prefixed(body: &[u8], out: &mut BytesMut) {
    let len = body.len();
    out.reserve(3 + len);
    out.extend_from_slice(&[
        ((len >> 16) & 0xFF) as u8,
        ((len >> 8) & 0xFF) as u8,
        (len & 0xFF) as u8,
    ]);
    out.extend_from_slice(body);
}

use bytes::Buf;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_and_applies_length_prefix() {
        let mut out = BytesMut::new();
        encode_length_prefixed(b"hello", &mut out);
        assert_eq!(&out[..3], &[0, 0, 5]);
        let mut input = out.clone();
        let body = decode_length_prefixed(&mut input).unwrap();
        assert_eq!(&body[..], b"hello");
        assert!(input.is_empty());
    }

    #[test]
    fn reports_incomplete_frame() {
        let mut out = BytesMut::new();
        encode_length_prefixed(b"hello", &mut out);
        out.truncate(out.len() - 1);
        assert!(decode_length_prefixed(&mut out).is_none());
    }
}
