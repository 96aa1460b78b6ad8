use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::FLAG_METADATA;
use crate::payload::Payload;

/// 24-bit big-endian length prefix used ahead of metadata blocks and ahead
/// of SETUP's MIME-type strings use a single byte instead (see `setup.rs`).
pub fn put_u24(bf: &mut BytesMut, n: usize) {
    bf.put_u8(((n >> 16) & 0xFF) as u8);
    bf.put_u8(((n >> 8) & 0xFF) as u8);
    bf.put_u8((n & 0xFF) as u8);
}

pub fn get_u24(bf: &mut BytesMut) -> usize {
    let a = bf.get_u8() as usize;
    let b = bf.get_u8() as usize;
    let c = bf.get_u8() as usize;
    (a << 16) | (b << 8) | c
}

/// Shared metadata+data read/write used by every frame body that carries a
/// `Payload` (REQUEST_*, PAYLOAD, metadata-only for METADATA_PUSH).
pub struct PayloadSupport;

impl PayloadSupport {
    /// Reads trailing metadata (if `FLAG_METADATA` is set) then the rest of
    /// the buffer as data.
    pub fn read(flag: u16, bf: &mut BytesMut) -> (Option<Bytes>, Option<Bytes>) {
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
        (metadata, data)
    }

    /// Reads metadata only, for bodies that never carry `data` (METADATA_PUSH).
    pub fn read_metadata_only(bf: &mut BytesMut) -> Option<Bytes> {
        if bf.is_empty() {
            None
        } else {
            Some(bf.split_to(bf.len()).freeze())
        }
    }

    pub fn write(bf: &mut BytesMut, metadata: &Option<Bytes>, data: &Option<Bytes>) {
        if let Some(m) = metadata {
            put_u24(bf, m.len());
            bf.put(m.clone());
        }
        if let Some(d) = data {
            bf.put(d.clone());
        }
    }

    pub fn len(metadata: &Option<Bytes>, data: &Option<Bytes>) -> usize {
        let mut n = 0;
        if let Some(m) = metadata {
            n += 3 + m.len();
        }
        if let Some(d) = data {
            n += d.len();
        }
        n
    }

    pub fn write_payload(bf: &mut BytesMut, payload: &Payload) {
        PayloadSupport::write(bf, payload.metadata(), payload.data());
    }

    pub fn payload_len(payload: &Payload) -> usize {
        PayloadSupport::len(payload.metadata(), payload.data())
    }
}
