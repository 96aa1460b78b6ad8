use bytes::BytesMut;

use super::utils::PayloadSupport;
use super::{Body, Frame, Writeable, FLAG_METADATA};
use crate::error::RSocketResult;
use crate::payload::Payload;

#[derive(Debug, PartialEq)]
pub struct RequestResponse {
    payload: Payload,
}

impl RequestResponse {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<RequestResponse> {
        let (metadata, data) = PayloadSupport::read(flag, bf);
        Ok(RequestResponse {
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
        Frame::new(
            stream_id,
            Body::RequestResponse(RequestResponse::from(payload)),
            flag,
        )
    }
}

impl From<Payload> for RequestResponse {
    fn from(payload: Payload) -> RequestResponse {
        RequestResponse { payload }
    }
}

impl Writeable for RequestResponse {
    fn write_to(&self, bf: &mut BytesMut) {
        PayloadSupport::write_payload(bf, &self.payload);
    }

    fn len(&self) -> usize {
        PayloadSupport::payload_len(&self.payload)
    }
}
