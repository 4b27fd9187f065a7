//! IEEE 1344 style frames: 6-byte preamble with a bit-packed sample word.

pub mod frame;
pub mod header;

pub use frame::{candidates, encode_frame, Ieee1344Frame};
pub use header::{CommonFrameHeader, FrameType, SampleWord};

use demuxprims_frame::{HeaderCodec, Result};

/// Dispatcher-facing codec for IEEE 1344 preambles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ieee1344Codec;

impl HeaderCodec for Ieee1344Codec {
    type Id = FrameType;

    fn name(&self) -> &'static str {
        "ieee1344"
    }

    fn preamble_len(&self) -> usize {
        header::PREAMBLE_LENGTH
    }

    fn peek_identifier(&self, buf: &[u8], start: usize) -> Result<FrameType> {
        CommonFrameHeader::peek_frame_type(buf, start)
    }
}
