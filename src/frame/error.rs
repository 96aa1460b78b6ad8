use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Body, Frame, Writeable};
use crate::error::RSocketResult;

#[derive(Debug, PartialEq)]
pub struct Error {
    code: u32,
    data: Bytes,
}

impl Error {
    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<Error> {
        let code = bf.get_u32();
        let data = bf.split_to(bf.len()).freeze();
        Ok(Error { code, data })
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn build_frame(stream_id: u32, code: u32, message: &str) -> Frame {
        Frame::new(
            stream_id,
            Body::Error(Error {
                code,
                data: Bytes::copy_from_slice(message.as_bytes()),
            }),
            0,
        )
    }
}

impl Writeable for Error {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.code);
        bf.extend_from_slice(&self.data);
    }

    fn len(&self) -> usize {
        4 + self.data.len()
    }
}
