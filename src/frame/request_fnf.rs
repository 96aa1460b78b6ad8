use bytes::BytesMut;

use super::utils::PayloadSupport;
use super::{Body, Frame, Writeable, FLAG_METADATA};
use crate::error::RSocketResult;
use crate::payload::Payload;

#[derive(Debug, PartialEq)]
pub struct RequestFNF {
    payload: Payload,
}

impl RequestFNF {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<RequestFNF> {
        let (metadata, data) = PayloadSupport::read(flag, bf);
        Ok(RequestFNF {
            payload: Payload::from_parts(metadata, data),
        })
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn build_frame(stream_id: u32, payload: Payload) -> Frame {
        let flag = if payload.has_metadata() {
            FLAG_METADATA
        } else {
            0
        };
        Frame::new(stream_id, Body::RequestFNF(RequestFNF::from(payload)), flag)
    }
}

impl From<Payload> for RequestFNF {
    fn from(payload: Payload) -> RequestFNF {
        RequestFNF { payload }
    }
}

impl Writeable for RequestFNF {
    fn write_to(&self, bf: &mut BytesMut) {
        PayloadSupport::write_payload(bf, &self.payload);
    }

    fn len(&self) -> usize {
        PayloadSupport::payload_len(&self.payload)
    }
}
