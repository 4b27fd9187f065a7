//! BPA PDCstream style frames: 4-byte preamble with sync byte and word count.

pub mod frame;
pub mod header;

pub use frame::{candidates, encode_frame, PdcStreamFrame};
pub use header::{CommonFrameHeader, FrameKind, ParsingOptions, SYNC_BYTE};

use demuxprims_frame::{HeaderCodec, Result};

/// Dispatcher-facing codec for PDCstream preambles.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdcStreamCodec {
    options: ParsingOptions,
}

impl PdcStreamCodec {
    pub fn new(options: ParsingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ParsingOptions {
        self.options
    }
}

impl HeaderCodec for PdcStreamCodec {
    type Id = FrameKind;

    fn name(&self) -> &'static str {
        "pdcstream"
    }

    fn preamble_len(&self) -> usize {
        header::PREAMBLE_LENGTH
    }

    fn peek_identifier(&self, buf: &[u8], start: usize) -> Result<FrameKind> {
        CommonFrameHeader::peek_kind(buf, start)
    }
}
