use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use serde::{Serialize, Serializer};

/// Opaque identifier correlating byte images to one logical connection or device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// One raw byte image tagged with the source that produced it.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    source: SourceId,
    bytes: Bytes,
    batch_order: u64,
}

impl FrameBuffer {
    pub fn new(source: impl Into<SourceId>, bytes: impl Into<Bytes>, batch_order: u64) -> Self {
        Self {
            source: source.into(),
            bytes: bytes.into(),
            batch_order,
        }
    }

    pub fn source(&self) -> &SourceId {
        &self.source
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Arrival sequence number assigned at enqueue.
    pub fn batch_order(&self) -> u64 {
        self.batch_order
    }

    /// Place leftover bytes from an earlier image of the same source in front of this one.
    pub fn prepend(&mut self, tail: &[u8]) {
        if tail.is_empty() {
            return;
        }
        let mut merged = BytesMut::with_capacity(tail.len() + self.bytes.len());
        merged.extend_from_slice(tail);
        merged.extend_from_slice(&self.bytes);
        self.bytes = merged.freeze();
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}
