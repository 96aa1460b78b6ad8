//! Binary frame codec (component C1 of the design).
//!
//! Every frame is a 48-bit header (31-bit stream id + 6-bit type + 10-bit
//! flags, big-endian) followed by a type-specific body. All multi-byte
//! integers on the wire are big-endian. The 3-byte length prefix used by
//! stream transports (TCP) is *not* part of a frame's own bytes; it is
//! applied/stripped by the transport framer (see `crate::transport`).

mod cancel;
mod error;
mod keepalive;
mod lease;
mod metadata_push;
mod payload_frame;
mod request_channel;
mod request_fnf;
mod request_n;
mod request_response;
mod request_stream;
mod resume;
mod resume_ok;
mod setup;
mod utils;

pub use error::Error;
pub use keepalive::Keepalive;
pub use lease::Lease;
pub use metadata_push::MetadataPush;
pub use payload_frame::PayloadFrame;
pub use request_channel::RequestChannel;
pub use request_fnf::RequestFNF;
pub use request_n::RequestN;
pub use request_response::RequestResponse;
pub use request_stream::RequestStream;
pub use resume::Resume;
pub use resume_ok::ResumeOK;
pub use setup::{Setup, SetupBuilder};
pub use utils::PayloadSupport;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{RSocketError, RSocketResult};

pub const FLAG_NEXT: u16 = 0x01 << 5;
pub const FLAG_COMPLETE: u16 = 0x01 << 6;
pub const FLAG_FOLLOW: u16 = 0x01 << 7;
pub const FLAG_METADATA: u16 = 0x01 << 8;
pub const FLAG_IGNORE: u16 = 0x01 << 9;
// these bits are reused across frame types, same as upstream RSocket:
pub const FLAG_LEASE: u16 = FLAG_COMPLETE;
pub const FLAG_RESUME_ENABLE: u16 = FLAG_FOLLOW;
pub const FLAG_RESPOND: u16 = FLAG_FOLLOW;

pub const TYPE_RESERVED: u16 = 0x00;
pub const TYPE_SETUP: u16 = 0x01;
pub const TYPE_LEASE: u16 = 0x02;
pub const TYPE_KEEPALIVE: u16 = 0x03;
pub const TYPE_REQUEST_RESPONSE: u16 = 0x04;
pub const TYPE_REQUEST_FNF: u16 = 0x05;
pub const TYPE_REQUEST_STREAM: u16 = 0x06;
pub const TYPE_REQUEST_CHANNEL: u16 = 0x07;
pub const TYPE_REQUEST_N: u16 = 0x08;
pub const TYPE_CANCEL: u16 = 0x09;
pub const TYPE_PAYLOAD: u16 = 0x0A;
pub const TYPE_ERROR: u16 = 0x0B;
pub const TYPE_METADATA_PUSH: u16 = 0x0C;
pub const TYPE_RESUME: u16 = 0x0D;
pub const TYPE_RESUME_OK: u16 = 0x0E;
pub const TYPE_EXT: u16 = 0x3F;

pub const ERR_INVALID_SETUP: u32 = 0x0000_0001;
pub const ERR_UNSUPPORTED_SETUP: u32 = 0x0000_0002;
pub const ERR_REJECT_SETUP: u32 = 0x0000_0003;
pub const ERR_REJECT_RESUME: u32 = 0x0000_0004;
pub const ERR_CONN_FAILED: u32 = 0x0000_0101;
pub const ERR_CONN_CLOSED: u32 = 0x0000_0102;
pub const ERR_APPLICATION: u32 = 0x0000_0201;
pub const ERR_REJECTED: u32 = 0x0000_0202;
pub const ERR_CANCELED: u32 = 0x0000_0203;
pub const ERR_INVALID: u32 = 0x0000_0204;

/// Maximum legal `REQUEST_N` / stream id value: `2^31 - 1`.
pub const REQUEST_MAX: u32 = 0x7FFF_FFFF;
const LEN_HEADER: usize = 6;
const STREAM_ID_MASK: u32 = 0x7FFF_FFFF;

pub trait Writeable {
    fn write_to(&self, bf: &mut BytesMut);
    fn len(&self) -> usize;
}

#[derive(Debug, PartialEq)]
pub enum Body {
    Setup(Setup),
    Lease(Lease),
    Keepalive(Keepalive),
    RequestFNF(RequestFNF),
    RequestResponse(RequestResponse),
    RequestStream(RequestStream),
    RequestChannel(RequestChannel),
    RequestN(RequestN),
    Cancel,
    Payload(PayloadFrame),
    Error(Error),
    MetadataPush(MetadataPush),
    Resume(Resume),
    ResumeOK(ResumeOK),
}

/// A single decoded/decodable protocol frame: header plus body.
#[derive(Debug, PartialEq)]
pub struct Frame {
    stream_id: u32,
    body: Body,
    flag: u16,
}

impl Frame {
    pub fn new(stream_id: u32, body: Body, flag: u16) -> Frame {
        Frame {
            stream_id,
            body,
            flag,
        }
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    pub fn flag(&self) -> u16 {
        self.flag
    }

    pub fn frame_type(&self) -> u16 {
        frame_type_of(&self.body)
    }

    pub fn has_next(&self) -> bool {
        self.flag & FLAG_NEXT != 0
    }

    pub fn has_complete(&self) -> bool {
        self.flag & FLAG_COMPLETE != 0
    }

    pub fn has_follows(&self) -> bool {
        self.flag & FLAG_FOLLOW != 0
    }

    pub fn has_metadata(&self) -> bool {
        self.flag & FLAG_METADATA != 0
    }

    pub fn has_ignore(&self) -> bool {
        self.flag & FLAG_IGNORE != 0
    }

    /// Validates that this frame's body is legal for its stream id (e.g.
    /// SETUP only ever targets stream 0; request-initiating frames never
    /// target stream 0). Called before encoding (§4.1).
    fn validate_stream_id(&self) -> RSocketResult<()> {
        let is_zero = self.stream_id == 0;
        let must_be_zero = matches!(
            self.body,
            Body::Setup(_) | Body::Lease(_) | Body::Keepalive(_) | Body::MetadataPush(_)
        );
        let must_be_nonzero = matches!(
            self.body,
            Body::RequestFNF(_)
                | Body::RequestResponse(_)
                | Body::RequestStream(_)
                | Body::RequestChannel(_)
                | Body::RequestN(_)
                | Body::Payload(_)
        );
        if must_be_zero && !is_zero {
            return Err(RSocketError::InvalidStreamID(self.stream_id));
        }
        if must_be_nonzero && is_zero {
            return Err(RSocketError::InvalidStreamID(self.stream_id));
        }
        if self.stream_id > STREAM_ID_MASK {
            return Err(RSocketError::InvalidStreamID(self.stream_id));
        }
        Ok(())
    }

    pub fn encode(&self) -> RSocketResult<Bytes> {
        self.validate_stream_id()?;
        let mut bf = BytesMut::with_capacity(LEN_HEADER + self.body_len());
        bf.put_u32(self.stream_id & STREAM_ID_MASK);
        bf.put_u16((self.frame_type() << 10) | self.flag);
        self.write_body(&mut bf);
        Ok(bf.freeze())
    }

    fn body_len(&self) -> usize {
        match &self.body {
            Body::Setup(v) => v.len(),
            Body::Lease(v) => v.len(),
            Body::Keepalive(v) => v.len(),
            Body::RequestFNF(v) => v.len(),
            Body::RequestResponse(v) => v.len(),
            Body::RequestStream(v) => v.len(),
            Body::RequestChannel(v) => v.len(),
            Body::RequestN(v) => v.len(),
            Body::Cancel => 0,
            Body::Payload(v) => v.len(),
            Body::Error(v) => v.len(),
            Body::MetadataPush(v) => v.len(),
            Body::Resume(v) => v.len(),
            Body::ResumeOK(v) => v.len(),
        }
    }

    fn write_body(&self, bf: &mut BytesMut) {
        match &self.body {
            Body::Setup(v) => v.write_to(bf),
            Body::Lease(v) => v.write_to(bf),
            Body::Keepalive(v) => v.write_to(bf),
            Body::RequestFNF(v) => v.write_to(bf),
            Body::RequestResponse(v) => v.write_to(bf),
            Body::RequestStream(v) => v.write_to(bf),
            Body::RequestChannel(v) => v.write_to(bf),
            Body::RequestN(v) => v.write_to(bf),
            Body::Cancel => (),
            Body::Payload(v) => v.write_to(bf),
            Body::Error(v) => v.write_to(bf),
            Body::MetadataPush(v) => v.write_to(bf),
            Body::Resume(v) => v.write_to(bf),
            Body::ResumeOK(v) => v.write_to(bf),
        }
    }

    /// Decodes one whole frame (sans length prefix) from `b`, advancing it.
    pub fn decode(b: &mut BytesMut) -> RSocketResult<Frame> {
        if b.len() < LEN_HEADER {
            return Err(RSocketError::InsufficientBytes);
        }
        let stream_id = b.get_u32() & STREAM_ID_MASK;
        let n = b.get_u16();
        let (flag, kind) = (n & 0x03FF, (n & 0xFC00) >> 10);
        let body = match kind {
            TYPE_SETUP => Setup::decode(flag, b).map(Body::Setup),
            TYPE_LEASE => Lease::decode(flag, b).map(Body::Lease),
            TYPE_KEEPALIVE => Keepalive::decode(flag, b).map(Body::Keepalive),
            TYPE_REQUEST_RESPONSE => RequestResponse::decode(flag, b).map(Body::RequestResponse),
            TYPE_REQUEST_FNF => RequestFNF::decode(flag, b).map(Body::RequestFNF),
            TYPE_REQUEST_STREAM => RequestStream::decode(flag, b).map(Body::RequestStream),
            TYPE_REQUEST_CHANNEL => RequestChannel::decode(flag, b).map(Body::RequestChannel),
            TYPE_REQUEST_N => RequestN::decode(flag, b).map(Body::RequestN),
            TYPE_CANCEL => Ok(Body::Cancel),
            TYPE_PAYLOAD => PayloadFrame::decode(flag, b).map(Body::Payload),
            TYPE_ERROR => Error::decode(flag, b).map(Body::Error),
            TYPE_METADATA_PUSH => MetadataPush::decode(flag, b).map(Body::MetadataPush),
            TYPE_RESUME => Resume::decode(flag, b).map(Body::Resume),
            TYPE_RESUME_OK => ResumeOK::decode(flag, b).map(Body::ResumeOK),
            _ => Err(RSocketError::UnsupportedFrameType(kind)),
        };
        body.map(|it| Frame::new(stream_id, it, flag))
    }
}

fn frame_type_of(body: &Body) -> u16 {
    match body {
        Body::Setup(_) => TYPE_SETUP,
        Body::Lease(_) => TYPE_LEASE,
        Body::Keepalive(_) => TYPE_KEEPALIVE,
        Body::RequestFNF(_) => TYPE_REQUEST_FNF,
        Body::RequestResponse(_) => TYPE_REQUEST_RESPONSE,
        Body::RequestStream(_) => TYPE_REQUEST_STREAM,
        Body::RequestChannel(_) => TYPE_REQUEST_CHANNEL,
        Body::RequestN(_) => TYPE_REQUEST_N,
        Body::Cancel => TYPE_CANCEL,
        Body::Payload(_) => TYPE_PAYLOAD,
        Body::Error(_) => TYPE_ERROR,
        Body::MetadataPush(_) => TYPE_METADATA_PUSH,
        Body::Resume(_) => TYPE_RESUME,
        Body::ResumeOK(_) => TYPE_RESUME_OK,
    }
}

/// True for frame types that carry a request-initiation for a new stream.
pub fn is_request_initiation(kind: u16) -> bool {
    matches!(
        kind,
        TYPE_REQUEST_RESPONSE | TYPE_REQUEST_FNF | TYPE_REQUEST_STREAM | TYPE_REQUEST_CHANNEL
    )
}

/// True for frame types legal on stream 0 (connection-level frames).
pub fn is_connection_frame(kind: u16) -> bool {
    matches!(
        kind,
        TYPE_SETUP
            | TYPE_LEASE
            | TYPE_KEEPALIVE
            | TYPE_METADATA_PUSH
            | TYPE_ERROR
            | TYPE_RESUME
            | TYPE_RESUME_OK
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;

    #[test]
    fn round_trips_request_response() {
        let payload = Payload::builder()
            .set_data(Bytes::from_static(b"Hello World"))
            .build();
        let frame = Frame::new(1, Body::RequestResponse(RequestResponse::from(payload)), 0);
        let mut encoded = BytesMut::from(&frame.encode().unwrap()[..]);
        let decoded = Frame::decode(&mut encoded).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn round_trips_payload_with_metadata() {
        let payload = Payload::builder()
            .set_metadata(Bytes::from_static(b"meta"))
            .set_data(Bytes::from_static(b"data"))
            .build();
        let frame = Frame::new(
            7,
            Body::Payload(PayloadFrame::from(payload)),
            FLAG_NEXT | FLAG_COMPLETE | FLAG_METADATA,
        );
        let mut encoded = BytesMut::from(&frame.encode().unwrap()[..]);
        let decoded = Frame::decode(&mut encoded).unwrap();
        assert_eq!(frame, decoded);
        assert!(decoded.has_next());
        assert!(decoded.has_complete());
    }

    #[test]
    fn rejects_setup_on_nonzero_stream() {
        let setup = Setup::builder(0, 0).build_body();
        let frame = Frame::new(3, Body::Setup(setup), 0);
        assert!(matches!(
            frame.encode(),
            Err(RSocketError::InvalidStreamID(3))
        ));
    }

    #[test]
    fn insufficient_bytes_rejected() {
        let mut bf = BytesMut::from(&b"\x00\x00"[..]);
        assert!(matches!(
            Frame::decode(&mut bf),
            Err(RSocketError::InsufficientBytes)
        ));
    }

    #[test]
    fn unknown_type_reported_for_caller_to_check_ignore_flag() {
        let mut bf = BytesMut::new();
        bf.put_u32(5);
        bf.put_u16((0x20 << 10) | FLAG_IGNORE);
        match Frame::decode(&mut bf) {
            Err(RSocketError::UnsupportedFrameType(0x20)) => (),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
