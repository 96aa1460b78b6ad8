use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Body, Frame, Writeable};
use crate::error::RSocketResult;

#[derive(Debug, PartialEq)]
pub struct Resume {
    major_version: u16,
    minor_version: u16,
    resume_token: Bytes,
    last_received_server_position: u64,
    first_available_client_position: u64,
}

impl Resume {
    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<Resume> {
        let major_version = bf.get_u16();
        let minor_version = bf.get_u16();
        let token_len = bf.get_u16() as usize;
        let resume_token = bf.split_to(token_len).freeze();
        let last_received_server_position = bf.get_u64();
        let first_available_client_position = bf.get_u64();
        Ok(Resume {
            major_version,
            minor_version,
            resume_token,
            last_received_server_position,
            first_available_client_position,
        })
    }

    pub fn resume_token(&self) -> &Bytes {
        &self.resume_token
    }

    pub fn last_received_server_position(&self) -> u64 {
        self.last_received_server_position
    }

    pub fn first_available_client_position(&self) -> u64 {
        self.first_available_client_position
    }

    pub fn build_frame(
        resume_token: Bytes,
        last_received_server_position: u64,
        first_available_client_position: u64,
    ) -> Frame {
        Frame::new(
            0,
            Body::Resume(Resume {
                major_version: super::setup::DEFAULT_VERSION.0,
                minor_version: super::setup::DEFAULT_VERSION.1,
                resume_token,
                last_received_server_position,
                first_available_client_position,
            }),
            0,
        )
    }
}

impl Writeable for Resume {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u16(self.major_version);
        bf.put_u16(self.minor_version);
        bf.put_u16(self.resume_token.len() as u16);
        bf.extend_from_slice(&self.resume_token);
        bf.put_u64(self.last_received_server_position);
        bf.put_u64(self.first_available_client_position);
    }

    fn len(&self) -> usize {
        2 + 2 + 2 + self.resume_token.len() + 8 + 8
    }
}
