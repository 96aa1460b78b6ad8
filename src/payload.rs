//! Application-facing payload: an opaque metadata/data pair (spec §3).
//!
//! This is the single `Payload` representation shared by the facades and by
//! every wire frame body that carries one (REQUEST_*, PAYLOAD). Presence of
//! metadata on the wire is signalled by the `METADATA` header flag, not by
//! the byte layout of the body itself, which is why `metadata` is an
//! `Option<Bytes>`: `None` and `Some(empty)` are distinguishable.

use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    metadata: Option<Bytes>,
    data: Option<Bytes>,
}

impl Payload {
    pub fn builder() -> PayloadBuilder {
        PayloadBuilder::default()
    }

    pub fn metadata(&self) -> &Option<Bytes> {
        &self.metadata
    }

    pub fn data(&self) -> &Option<Bytes> {
        &self.data
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn split(self) -> (Option<Bytes>, Option<Bytes>) {
        (self.metadata, self.data)
    }

    pub fn from_parts(metadata: Option<Bytes>, data: Option<Bytes>) -> Payload {
        Payload { metadata, data }
    }

    /// Concatenates `other` onto this payload's data and, if either side has
    /// metadata, onto metadata as well. Used to reassemble `FOLLOWS`
    /// fragments (spec §3, §4.5 "Fragmentation").
    pub fn append_fragment(&mut self, other: Payload) {
        let (other_metadata, other_data) = other.split();
        if let Some(om) = other_metadata {
            let mut m = self.metadata.take().unwrap_or_default().to_vec();
            m.extend_from_slice(&om);
            self.metadata = Some(Bytes::from(m));
        }
        if let Some(od) = other_data {
            let mut d = self.data.take().unwrap_or_default().to_vec();
            d.extend_from_slice(&od);
            self.data = Some(Bytes::from(d));
        }
    }
}

#[derive(Default)]
pub struct PayloadBuilder {
    metadata: Option<Bytes>,
    data: Option<Bytes>,
}

impl PayloadBuilder {
    pub fn set_metadata(mut self, metadata: Bytes) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn set_metadata_utf8(self, metadata: &str) -> Self {
        self.set_metadata(Bytes::copy_from_slice(metadata.as_bytes()))
    }

    pub fn set_data(mut self, data: Bytes) -> Self {
        self.data = Some(data);
        self
    }

    pub fn set_data_utf8(self, data: &str) -> Self {
        self.set_data(Bytes::copy_from_slice(data.as_bytes()))
    }

    pub fn build(self) -> Payload {
        Payload {
            metadata: self.metadata,
            data: self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinguishes_absent_from_empty_metadata() {
        let absent = Payload::builder().set_data_utf8("x").build();
        let empty = Payload::from_parts(Some(Bytes::new()), Some(Bytes::from_static(b"x")));
        assert!(!absent.has_metadata());
        assert!(empty.has_metadata());
        assert_ne!(absent, empty);
    }

    #[test]
    fn append_fragment_concatenates_data() {
        let mut p = Payload::builder().set_data_utf8("Hello").build();
        p.append_fragment(Payload::builder().set_data_utf8(" World").build());
        assert_eq!(p.data().as_ref().unwrap(), &Bytes::from_static(b"Hello World"));
    }
}
