use bytes::{Bytes, BytesMut};

use super::utils::PayloadSupport;
use super::{Body, Frame, Writeable, FLAG_METADATA};
use crate::error::RSocketResult;

#[derive(Debug, PartialEq)]
pub struct MetadataPush {
    metadata: Option<Bytes>,
}

impl MetadataPush {
    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<MetadataPush> {
        Ok(MetadataPush {
            metadata: PayloadSupport::read_metadata_only(bf),
        })
    }

    pub fn metadata(&self) -> &Option<Bytes> {
        &self.metadata
    }

    pub fn build_frame(metadata: Bytes) -> Frame {
        Frame::new(
            0,
            Body::MetadataPush(MetadataPush {
                metadata: Some(metadata),
            }),
            FLAG_METADATA,
        )
    }
}

impl Writeable for MetadataPush {
    fn write_to(&self, bf: &mut BytesMut) {
        if let Some(m) = &self.metadata {
            bf.extend_from_slice(m);
        }
    }

    fn len(&self) -> usize {
        self.metadata.as_ref().map_or(0, |m| m.len())
    }
}
