use bytes::{Buf, BufMut, BytesMut};

use super::utils::PayloadSupport;
use super::{Body, Frame, Writeable, FLAG_METADATA};
use crate::error::RSocketResult;
use crate::payload::Payload;

#[derive(Debug, PartialEq)]
pub struct RequestStream {
    initial_request_n: u32,
    payload: Payload,
}

impl RequestStream {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<RequestStream> {
        let initial_request_n = bf.get_u32();
        let (metadata, data) = PayloadSupport::read(flag, bf);
        Ok(RequestStream {
            initial_request_n,
            payload: Payload::from_parts(metadata, data),
        })
    }

    pub fn initial_request_n(&self) -> u32 {
        self.initial_request_n
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn build_frame(stream_id: u32, initial_request_n: u32, payload: Payload) -> Frame {
        let flag = if payload.has_metadata() {
            FLAG_METADATA
        } else {
            0
        };
        Frame::new(
            stream_id,
            Body::RequestStream(RequestStream {
                initial_request_n,
                payload,
            }),
            flag,
        )
    }
}

impl Writeable for RequestStream {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.initial_request_n);
        PayloadSupport::write_payload(bf, &self.payload);
    }

    fn len(&self) -> usize {
        4 + PayloadSupport::payload_len(&self.payload)
    }
}
