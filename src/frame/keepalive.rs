use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Body, Frame, Writeable, FLAG_RESPOND};
use crate::error::RSocketResult;

#[derive(Debug, PartialEq)]
pub struct Keepalive {
    last_received_position: u64,
    data: Option<Bytes>,
}

impl Keepalive {
    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<Keepalive> {
        let last_received_position = bf.get_u64();
        let data = if bf.is_empty() {
            None
        } else {
            Some(bf.split_to(bf.len()).freeze())
        };
        Ok(Keepalive {
            last_received_position,
            data,
        })
    }

    pub fn last_received_position(&self) -> u64 {
        self.last_received_position
    }

    pub fn data(&self) -> &Option<Bytes> {
        &self.data
    }

    pub fn build_frame(respond: bool, last_received_position: u64, data: Option<Bytes>) -> Frame {
        let flag = if respond { FLAG_RESPOND } else { 0 };
        Frame::new(
            0,
            Body::Keepalive(Keepalive {
                last_received_position,
                data,
            }),
            flag,
        )
    }
}

impl Writeable for Keepalive {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u64(self.last_received_position);
        if let Some(d) = &self.data {
            bf.extend_from_slice(d);
        }
    }

    fn len(&self) -> usize {
        8 + self.data.as_ref().map_or(0, |d| d.len())
    }
}
