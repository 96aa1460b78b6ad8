use bytes::BytesMut;

use super::utils::PayloadSupport;
use super::{Body, Frame, Writeable, FLAG_COMPLETE, FLAG_METADATA, FLAG_NEXT};
use crate::error::RSocketResult;
use crate::payload::Payload;

/// Body of a `PAYLOAD` frame. Semantics (`NEXT`/`COMPLETE`/`FOLLOWS`) live on
/// the frame header's flags, not here; this just carries the octets.
#[derive(Debug, PartialEq)]
pub struct PayloadFrame {
    payload: Payload,
}

impl PayloadFrame {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<PayloadFrame> {
        let (metadata, data) = PayloadSupport::read(flag, bf);
        Ok(PayloadFrame {
            payload: Payload::from_parts(metadata, data),
        })
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn build_frame(stream_id: u32, payload: Payload, next: bool, complete: bool) -> Frame {
        let mut flag = if payload.has_metadata() {
            FLAG_METADATA
        } else {
            0
        };
        if next {
            flag |= FLAG_NEXT;
        }
        if complete {
            flag |= FLAG_COMPLETE;
        }
        Frame::new(stream_id, Body::Payload(PayloadFrame { payload }), flag)
    }
}

impl From<Payload> for PayloadFrame {
    fn from(payload: Payload) -> PayloadFrame {
        PayloadFrame { payload }
    }
}

impl Writeable for PayloadFrame {
    fn write_to(&self, bf: &mut BytesMut) {
        PayloadSupport::write_payload(bf, &self.payload);
    }

    fn len(&self) -> usize {
        PayloadSupport::payload_len(&self.payload)
    }
}
