use std::any::Any;

use bytes::{Bytes, BytesMut};
use demuxprims_frame::{
    append_checksum, verify_checksum, BoxedFrame, DecodedFrame, FragmentState, FrameCandidate,
    FrameError, Result, Timestamp, CHECKSUM_SIZE,
};

use super::header::{CommonFrameHeader, FrameType, HEADER_LENGTH};

/// One decoded IEEE 1344 frame of a fixed type.
///
/// The body (everything between the frame length word and the checksum) is
/// kept opaque.
#[derive(Debug, Clone)]
pub struct Ieee1344Frame {
    frame_type: FrameType,
    header: Option<CommonFrameHeader>,
    body: Bytes,
}

impl Ieee1344Frame {
    pub fn new(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            header: None,
            body: Bytes::new(),
        }
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Header of the decoded frame, `None` until `consume` succeeds.
    pub fn header(&self) -> Option<&CommonFrameHeader> {
        self.header.as_ref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl DecodedFrame for Ieee1344Frame {
    type Id = FrameType;

    fn identifier(&self) -> Option<FrameType> {
        Some(self.frame_type)
    }

    fn consume(&mut self, buf: &[u8], start: usize) -> Result<usize> {
        let header = CommonFrameHeader::decode(buf, start)?;
        if header.frame_type() != self.frame_type {
            return Err(FrameError::UnexpectedType {
                expected: self.frame_type.to_string(),
                found: header.frame_type().to_string(),
            });
        }

        let length = header.frame_length();
        verify_checksum(buf, start, length).inspect_err(|err| {
            if !err.is_incomplete() {
                tracing::trace!(error = %err, frame_type = %self.frame_type, "rejecting frame");
            }
        })?;

        self.body = Bytes::copy_from_slice(&buf[start + HEADER_LENGTH..start + length - CHECKSUM_SIZE]);
        self.header = Some(header);
        Ok(length)
    }

    fn frame_length(&self) -> usize {
        self.header.map_or(0, |header| header.frame_length())
    }

    fn timestamp(&self) -> Option<Timestamp> {
        self.header.map(|header| header.timestamp())
    }

    fn fragment_state(&self) -> FragmentState {
        self.header
            .map_or(FragmentState::Unfragmented, |header| header.fragment_state())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registry candidates for the three defined frame types.
pub fn candidates() -> Vec<FrameCandidate<FrameType>> {
    vec![
        FrameCandidate::new("ieee1344::DataFrame", || {
            Ok(Box::new(Ieee1344Frame::new(FrameType::DATA)) as BoxedFrame<FrameType>)
        }),
        FrameCandidate::new("ieee1344::HeaderFrame", || {
            Ok(Box::new(Ieee1344Frame::new(FrameType::HEADER)) as BoxedFrame<FrameType>)
        }),
        FrameCandidate::new("ieee1344::ConfigurationFrame", || {
            Ok(Box::new(Ieee1344Frame::new(FrameType::CONFIGURATION)) as BoxedFrame<FrameType>)
        }),
    ]
}

/// Build a complete, checksummed frame image.
///
/// The frame length in `header` is replaced to fit `body`.
pub fn encode_frame(header: CommonFrameHeader, body: &[u8]) -> Result<Bytes> {
    let header = header.with_frame_length(HEADER_LENGTH + body.len() + CHECKSUM_SIZE)?;
    let mut dst = BytesMut::with_capacity(header.frame_length());
    header.encode(&mut dst);
    dst.extend_from_slice(body);
    append_checksum(&mut dst, 0);
    Ok(dst.freeze())
}
