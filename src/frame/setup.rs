use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::utils::{get_u24, put_u24};
use super::{Body, Frame, Writeable, FLAG_LEASE, FLAG_METADATA, FLAG_RESUME_ENABLE};
use crate::error::{RSocketError, RSocketResult};
use crate::payload::Payload;

pub const DEFAULT_VERSION: (u16, u16) = (1, 0);
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, PartialEq)]
pub struct Setup {
    major_version: u16,
    minor_version: u16,
    keepalive_millis: u32,
    max_lifetime_millis: u32,
    resume_token: Option<Bytes>,
    metadata_mime_type: String,
    data_mime_type: String,
    honors_lease: bool,
    payload: Payload,
}

impl Setup {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<Setup> {
        let major_version = bf.get_u16();
        let minor_version = bf.get_u16();
        let keepalive_millis = bf.get_u32();
        let max_lifetime_millis = bf.get_u32();
        let resume_token = if flag & FLAG_RESUME_ENABLE != 0 {
            let len = bf.get_u16() as usize;
            Some(bf.split_to(len).freeze())
        } else {
            None
        };
        let metadata_mime_type = read_mime(bf)?;
        let data_mime_type = read_mime(bf)?;
        let metadata = if flag & FLAG_METADATA != 0 {
            let len = get_u24(bf);
            Some(bf.split_to(len).freeze())
        } else {
            None
        };
        let data = if bf.is_empty() {
            None
        } else {
            Some(bf.split_to(bf.len()).freeze())
        };
        Ok(Setup {
            major_version,
            minor_version,
            keepalive_millis,
            max_lifetime_millis,
            resume_token,
            metadata_mime_type,
            data_mime_type,
            honors_lease: flag & FLAG_LEASE != 0,
            payload: Payload::from_parts(metadata, data),
        })
    }

    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn keepalive_millis(&self) -> u32 {
        self.keepalive_millis
    }

    pub fn max_lifetime_millis(&self) -> u32 {
        self.max_lifetime_millis
    }

    pub fn resume_token(&self) -> &Option<Bytes> {
        &self.resume_token
    }

    pub fn metadata_mime_type(&self) -> &str {
        &self.metadata_mime_type
    }

    pub fn data_mime_type(&self) -> &str {
        &self.data_mime_type
    }

    pub fn honors_lease(&self) -> bool {
        self.honors_lease
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn builder(keepalive_millis: u32, max_lifetime_millis: u32) -> SetupBuilder {
        SetupBuilder::new(keepalive_millis, max_lifetime_millis)
    }
}

fn read_mime(bf: &mut BytesMut) -> RSocketResult<String> {
    let len = bf.get_u8() as usize;
    if bf.len() < len {
        return Err(RSocketError::InvalidHeader("truncated mime type".into()));
    }
    let raw = bf.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|_| RSocketError::InvalidHeader("mime type not utf-8".into()))
}

fn write_mime(bf: &mut BytesMut, mime: &str) {
    bf.put_u8(mime.len() as u8);
    bf.extend_from_slice(mime.as_bytes());
}

impl Writeable for Setup {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u16(self.major_version);
        bf.put_u16(self.minor_version);
        bf.put_u32(self.keepalive_millis);
        bf.put_u32(self.max_lifetime_millis);
        if let Some(token) = &self.resume_token {
            bf.put_u16(token.len() as u16);
            bf.extend_from_slice(token);
        }
        write_mime(bf, &self.metadata_mime_type);
        write_mime(bf, &self.data_mime_type);
        if let Some(m) = self.payload.metadata() {
            put_u24(bf, m.len());
            bf.extend_from_slice(m);
        }
        if let Some(d) = self.payload.data() {
            bf.extend_from_slice(d);
        }
    }

    fn len(&self) -> usize {
        let mut n = 2 + 2 + 4 + 4;
        if let Some(token) = &self.resume_token {
            n += 2 + token.len();
        }
        n += 1 + self.metadata_mime_type.len();
        n += 1 + self.data_mime_type.len();
        if let Some(m) = self.payload.metadata() {
            n += 3 + m.len();
        }
        if let Some(d) = self.payload.data() {
            n += d.len();
        }
        n
    }
}

pub struct SetupBuilder {
    value: Setup,
}

impl SetupBuilder {
    fn new(keepalive_millis: u32, max_lifetime_millis: u32) -> SetupBuilder {
        SetupBuilder {
            value: Setup {
                major_version: DEFAULT_VERSION.0,
                minor_version: DEFAULT_VERSION.1,
                keepalive_millis,
                max_lifetime_millis,
                resume_token: None,
                metadata_mime_type: DEFAULT_MIME_TYPE.to_owned(),
                data_mime_type: DEFAULT_MIME_TYPE.to_owned(),
                honors_lease: false,
                payload: Payload::default(),
            },
        }
    }

    pub fn set_metadata_mime_type(mut self, mime: &str) -> Self {
        self.value.metadata_mime_type = mime.to_owned();
        self
    }

    pub fn set_data_mime_type(mut self, mime: &str) -> Self {
        self.value.data_mime_type = mime.to_owned();
        self
    }

    pub fn set_resume_token(mut self, token: Bytes) -> Self {
        self.value.resume_token = Some(token);
        self
    }

    pub fn set_honors_lease(mut self, honors_lease: bool) -> Self {
        self.value.honors_lease = honors_lease;
        self
    }

    pub fn set_payload(mut self, payload: Payload) -> Self {
        self.value.payload = payload;
        self
    }

    pub fn build_body(self) -> Setup {
        self.value
    }

    pub fn build_frame(self) -> Frame {
        let mut flag = 0;
        if self.value.resume_token.is_some() {
            flag |= FLAG_RESUME_ENABLE;
        }
        if self.value.honors_lease {
            flag |= FLAG_LEASE;
        }
        if self.value.payload.has_metadata() {
            flag |= FLAG_METADATA;
        }
        Frame::new(0, Body::Setup(self.value), flag)
    }
}
