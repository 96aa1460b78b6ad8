use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Body, Frame, Writeable, FLAG_METADATA};
use crate::error::RSocketResult;

#[derive(Debug, PartialEq)]
pub struct Lease {
    ttl: u32,
    number_of_requests: u32,
    metadata: Option<Bytes>,
}

impl Lease {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<Lease> {
        let ttl = bf.get_u32();
        let number_of_requests = bf.get_u32();
        let metadata = if flag & FLAG_METADATA != 0 && !bf.is_empty() {
            Some(bf.split_to(bf.len()).freeze())
        } else {
            None
        };
        Ok(Lease {
            ttl,
            number_of_requests,
            metadata,
        })
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn number_of_requests(&self) -> u32 {
        self.number_of_requests
    }

    pub fn metadata(&self) -> &Option<Bytes> {
        &self.metadata
    }

    pub fn build_frame(ttl: u32, number_of_requests: u32, metadata: Option<Bytes>) -> Frame {
        let flag = if metadata.is_some() { FLAG_METADATA } else { 0 };
        Frame::new(
            0,
            Body::Lease(Lease {
                ttl,
                number_of_requests,
                metadata,
            }),
            flag,
        )
    }
}

impl Writeable for Lease {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.ttl);
        bf.put_u32(self.number_of_requests);
        if let Some(m) = &self.metadata {
            bf.extend_from_slice(m);
        }
    }

    fn len(&self) -> usize {
        8 + self.metadata.as_ref().map_or(0, |m| m.len())
    }
}
