use std::any::Any;

use bytes::{Bytes, BytesMut};
use demuxprims_frame::{
    append_checksum, verify_checksum, BoxedFrame, DecodedFrame, FrameCandidate, FrameError,
    Result, Timestamp, CHECKSUM_SIZE,
};

use super::header::{CommonFrameHeader, FrameKind, ParsingOptions, PREAMBLE_LENGTH};

/// One decoded PDCstream frame of a fixed kind.
#[derive(Debug, Clone)]
pub struct PdcStreamFrame {
    kind: FrameKind,
    options: ParsingOptions,
    header: Option<CommonFrameHeader>,
    body: Bytes,
}

impl PdcStreamFrame {
    pub fn new(kind: FrameKind, options: ParsingOptions) -> Self {
        Self {
            kind,
            options,
            header: None,
            body: Bytes::new(),
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn options(&self) -> ParsingOptions {
        self.options
    }

    /// Header of the decoded frame, `None` until `consume` succeeds.
    pub fn header(&self) -> Option<&CommonFrameHeader> {
        self.header.as_ref()
    }

    /// Bytes between the preamble and the checksum.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl DecodedFrame for PdcStreamFrame {
    type Id = FrameKind;

    fn identifier(&self) -> Option<FrameKind> {
        Some(self.kind)
    }

    fn consume(&mut self, buf: &[u8], start: usize) -> Result<usize> {
        let header = CommonFrameHeader::decode(buf, start, self.options)?;
        if header.kind() != self.kind {
            return Err(FrameError::UnexpectedType {
                expected: self.kind.to_string(),
                found: header.kind().to_string(),
            });
        }

        let length = header.frame_length();
        verify_checksum(buf, start, length).inspect_err(|err| {
            if !err.is_incomplete() {
                tracing::trace!(error = %err, kind = %self.kind, "rejecting frame");
            }
        })?;

        self.body =
            Bytes::copy_from_slice(&buf[start + PREAMBLE_LENGTH..start + length - CHECKSUM_SIZE]);
        self.header = Some(header);
        Ok(length)
    }

    fn frame_length(&self) -> usize {
        self.header.map_or(0, |header| header.frame_length())
    }

    fn timestamp(&self) -> Option<Timestamp> {
        self.header.and_then(|header| header.timestamp())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registry candidates for configuration and data frames.
///
/// `options` is captured by every factory so frames decode exactly as the
/// codec peeks.
pub fn candidates(options: ParsingOptions) -> Vec<FrameCandidate<FrameKind>> {
    vec![
        FrameCandidate::new("pdcstream::ConfigurationFrame", move || {
            Ok(Box::new(PdcStreamFrame::new(FrameKind::Configuration, options))
                as BoxedFrame<FrameKind>)
        }),
        FrameCandidate::new("pdcstream::DataFrame", move || {
            Ok(Box::new(PdcStreamFrame::new(FrameKind::Data, options)) as BoxedFrame<FrameKind>)
        }),
    ]
}

/// Build a complete, checksummed frame image.
///
/// The word count in `header` is replaced to fit `body`, which must leave
/// the frame a whole number of words long.
pub fn encode_frame(
    header: CommonFrameHeader,
    body: &[u8],
    options: ParsingOptions,
) -> Result<Bytes> {
    let header = header.with_frame_length(PREAMBLE_LENGTH + body.len() + CHECKSUM_SIZE)?;
    let mut dst = BytesMut::with_capacity(header.frame_length());
    header.encode(&mut dst, options)?;
    dst.extend_from_slice(body);
    append_checksum(&mut dst, 0);
    Ok(dst.freeze())
}
