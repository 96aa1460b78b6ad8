use bytes::{Buf, BufMut, BytesMut};

use super::{Body, Frame, Writeable};
use crate::error::RSocketResult;

#[derive(Debug, PartialEq)]
pub struct RequestN {
    n: u32,
}

impl RequestN {
    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<RequestN> {
        Ok(RequestN { n: bf.get_u32() })
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn build_frame(stream_id: u32, n: u32) -> Frame {
        Frame::new(stream_id, Body::RequestN(RequestN { n }), 0)
    }
}

impl Writeable for RequestN {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.n);
    }

    fn len(&self) -> usize {
        4
    }
}
