use bytes::{Buf, BufMut, BytesMut};

use super::{Body, Frame, Writeable};
use crate::error::RSocketResult;

#[derive(Debug, PartialEq)]
pub struct ResumeOK {
    last_received_client_position: u64,
}

impl ResumeOK {
    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<ResumeOK> {
        Ok(ResumeOK {
            last_received_client_position: bf.get_u64(),
        })
    }

    pub fn last_received_client_position(&self) -> u64 {
        self.last_received_client_position
    }

    pub fn build_frame(last_received_client_position: u64) -> Frame {
        Frame::new(
            0,
            Body::ResumeOK(ResumeOK {
                last_received_client_position,
            }),
            0,
        )
    }
}

impl Writeable for ResumeOK {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u64(self.last_received_client_position);
    }

    fn len(&self) -> usize {
        8
    }
}
