use std::fmt;

use bytes::{BufMut, BytesMut};
use demuxprims_frame::{FragmentState, FrameError, Result, Timestamp, CHECKSUM_SIZE};
use serde::Serialize;

/// Preamble: second of century (4) + sample word (2) = 6 bytes.
pub const PREAMBLE_LENGTH: usize = 6;

/// Offset of the frame length word, immediately after the preamble.
pub const FRAME_LENGTH_OFFSET: usize = PREAMBLE_LENGTH;

/// Preamble plus the frame length word.
pub const HEADER_LENGTH: usize = PREAMBLE_LENGTH + 2;

/// Sample word bits 15-13: frame type.
pub const FRAME_TYPE_MASK: u16 = 0xE000;

/// Sample word bit 12: clear on the first fragment of a frame.
pub const FIRST_FRAME_FLAG: u16 = 0x1000;

/// Sample word bit 11: clear on the last fragment of a frame.
pub const LAST_FRAME_FLAG: u16 = 0x0800;

/// Sample word bits 10-0: sample count (data) or fragment count (header/configuration).
pub const COUNT_MASK: u16 = 0x07FF;

pub const MAX_SAMPLE_COUNT: u16 = COUNT_MASK;

pub const MAX_FRAME_LENGTH: usize = u16::MAX as usize;

/// The frame length always covers the header and the checksum trailer.
pub const MIN_FRAME_LENGTH: usize = HEADER_LENGTH + CHECKSUM_SIZE;

/// Data length excludes the preamble and the checksum trailer.
pub const MAX_DATA_LENGTH: usize = MAX_FRAME_LENGTH - PREAMBLE_LENGTH - CHECKSUM_SIZE;

pub const MIN_DATA_LENGTH: usize = MIN_FRAME_LENGTH - PREAMBLE_LENGTH - CHECKSUM_SIZE;

/// Frame type carried in the top three bits of the sample word.
///
/// Values outside the three defined types are representable so that the
/// dispatcher can report them as unknown identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameType(u16);

impl FrameType {
    pub const DATA: FrameType = FrameType(0x0000);
    pub const HEADER: FrameType = FrameType(0x2000);
    pub const CONFIGURATION: FrameType = FrameType(0x4000);

    /// Extract the frame type from a full sample word.
    pub const fn from_sample_word(word: u16) -> Self {
        Self(word & FRAME_TYPE_MASK)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self {
            FrameType::DATA => "data",
            FrameType::HEADER => "header",
            FrameType::CONFIGURATION => "configuration",
            _ => "reserved",
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FrameType::DATA | FrameType::HEADER | FrameType::CONFIGURATION => {
                f.write_str(self.name())
            }
            _ => write!(f, "reserved(0x{:04X})", self.0),
        }
    }
}

impl Serialize for FrameType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The bit-packed sample word.
///
/// Frame type, both fragment flags and the count share one 16-bit value;
/// every accessor masks on read and every `with_*` returns a new word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleWord(u16);

impl SampleWord {
    /// Unfragmented word of the given type with a zero count.
    pub const fn new(frame_type: FrameType) -> Self {
        Self(frame_type.bits())
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn frame_type(self) -> FrameType {
        FrameType::from_sample_word(self.0)
    }

    pub const fn sample_count(self) -> u16 {
        self.0 & COUNT_MASK
    }

    pub const fn is_first_frame(self) -> bool {
        self.0 & FIRST_FRAME_FLAG == 0
    }

    pub const fn is_last_frame(self) -> bool {
        self.0 & LAST_FRAME_FLAG == 0
    }

    pub fn fragment_state(self) -> FragmentState {
        FragmentState::from_flags(self.is_first_frame(), self.is_last_frame())
    }

    pub const fn with_frame_type(self, frame_type: FrameType) -> Self {
        Self((self.0 & !FRAME_TYPE_MASK) | frame_type.bits())
    }

    /// Replace the count field; values above [`MAX_SAMPLE_COUNT`] are an overflow.
    pub fn with_sample_count(self, count: u16) -> Result<Self> {
        if count > MAX_SAMPLE_COUNT {
            return Err(FrameError::Overflow {
                field: "sample count",
                value: usize::from(count),
                max: usize::from(MAX_SAMPLE_COUNT),
            });
        }
        Ok(Self((self.0 & !COUNT_MASK) | count))
    }

    pub const fn with_first_frame(self, is_first: bool) -> Self {
        if is_first {
            Self(self.0 & !FIRST_FRAME_FLAG)
        } else {
            Self(self.0 | FIRST_FRAME_FLAG)
        }
    }

    pub const fn with_last_frame(self, is_last: bool) -> Self {
        if is_last {
            Self(self.0 & !LAST_FRAME_FLAG)
        } else {
            Self(self.0 | LAST_FRAME_FLAG)
        }
    }

    pub fn with_fragment_state(self, state: FragmentState) -> Self {
        self.with_first_frame(state.is_first())
            .with_last_frame(state.is_last())
    }
}

/// Common header shared by every IEEE 1344 frame.
///
/// ```text
/// ┌──────────────────┬──────────────┬──────────────┬──────────┬──────────┐
/// │ SOC (4B BE)      │ Sample word  │ Frame length │ Data     │ CRC      │
/// │ NTP-epoch secs   │ (2B BE)      │ (2B BE)      │          │ (2B BE)  │
/// └──────────────────┴──────────────┴──────────────┴──────────┴──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommonFrameHeader {
    second_of_century: u32,
    sample_word: SampleWord,
    frame_length: u16,
}

impl CommonFrameHeader {
    /// Unfragmented header with a zero count and an empty body.
    pub const fn new(frame_type: FrameType, second_of_century: u32) -> Self {
        Self {
            second_of_century,
            sample_word: SampleWord::new(frame_type),
            frame_length: MIN_FRAME_LENGTH as u16,
        }
    }

    /// Read only the frame type at `start`.
    pub fn peek_frame_type(buf: &[u8], start: usize) -> Result<FrameType> {
        require(buf, start, PREAMBLE_LENGTH)?;
        let word = u16::from_be_bytes([buf[start + 4], buf[start + 5]]);
        Ok(FrameType::from_sample_word(word))
    }

    /// Decode the preamble and frame length word at `start`.
    pub fn decode(buf: &[u8], start: usize) -> Result<Self> {
        require(buf, start, HEADER_LENGTH)?;
        let at = &buf[start..start + HEADER_LENGTH];
        let second_of_century = u32::from_be_bytes([at[0], at[1], at[2], at[3]]);
        let sample_word = SampleWord::from_bits(u16::from_be_bytes([at[4], at[5]]));
        let frame_length = u16::from_be_bytes([at[6], at[7]]);

        Self {
            second_of_century,
            sample_word,
            frame_length: MIN_FRAME_LENGTH as u16,
        }
        .with_frame_length(usize::from(frame_length))
    }

    /// Write the preamble and frame length word.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_LENGTH);
        dst.put_u32(self.second_of_century);
        dst.put_u16(self.sample_word.bits());
        dst.put_u16(self.frame_length);
    }

    pub const fn second_of_century(&self) -> u32 {
        self.second_of_century
    }

    pub const fn sample_word(&self) -> SampleWord {
        self.sample_word
    }

    pub const fn frame_type(&self) -> FrameType {
        self.sample_word.frame_type()
    }

    pub const fn sample_count(&self) -> u16 {
        self.sample_word.sample_count()
    }

    pub const fn is_first_frame(&self) -> bool {
        self.sample_word.is_first_frame()
    }

    pub const fn is_last_frame(&self) -> bool {
        self.sample_word.is_last_frame()
    }

    pub fn fragment_state(&self) -> FragmentState {
        self.sample_word.fragment_state()
    }

    /// Total wire length including header and checksum.
    pub const fn frame_length(&self) -> usize {
        self.frame_length as usize
    }

    /// Bytes after the preamble, excluding the checksum.
    pub const fn data_length(&self) -> usize {
        self.frame_length as usize - PREAMBLE_LENGTH - CHECKSUM_SIZE
    }

    pub const fn with_second_of_century(mut self, second_of_century: u32) -> Self {
        self.second_of_century = second_of_century;
        self
    }

    pub const fn with_sample_word(mut self, sample_word: SampleWord) -> Self {
        self.sample_word = sample_word;
        self
    }

    pub fn with_sample_count(mut self, count: u16) -> Result<Self> {
        self.sample_word = self.sample_word.with_sample_count(count)?;
        Ok(self)
    }

    pub fn with_fragment_state(mut self, state: FragmentState) -> Self {
        self.sample_word = self.sample_word.with_fragment_state(state);
        self
    }

    /// Set the total frame length; out-of-range values fail immediately.
    pub fn with_frame_length(mut self, frame_length: usize) -> Result<Self> {
        if frame_length > MAX_FRAME_LENGTH {
            return Err(FrameError::Overflow {
                field: "frame length",
                value: frame_length,
                max: MAX_FRAME_LENGTH,
            });
        }
        if frame_length < MIN_FRAME_LENGTH {
            return Err(FrameError::InvalidLength {
                field: "frame length",
                value: frame_length,
                reason: "shorter than header plus checksum",
            });
        }
        self.frame_length = frame_length as u16;
        Ok(self)
    }

    /// Set the data length; the frame length follows.
    pub fn with_data_length(self, data_length: usize) -> Result<Self> {
        if data_length > MAX_DATA_LENGTH {
            return Err(FrameError::Overflow {
                field: "data length",
                value: data_length,
                max: MAX_DATA_LENGTH,
            });
        }
        if data_length < MIN_DATA_LENGTH {
            return Err(FrameError::InvalidLength {
                field: "data length",
                value: data_length,
                reason: "shorter than the frame length word",
            });
        }
        self.with_frame_length(data_length + PREAMBLE_LENGTH + CHECKSUM_SIZE)
    }

    /// Coarse time tag: the second of century counted from 1900-01-01.
    pub fn timestamp(&self) -> Timestamp {
        Timestamp::from_ntp_seconds(self.second_of_century)
    }

    /// Time tag refined by the sample position within the second.
    ///
    /// For data frames the sample count selects a sub-second slot:
    /// `count / floor(MAX_SAMPLE_COUNT / period) / frame_rate` seconds are
    /// added to the coarse tag. Other frame types, or a zero `period` or
    /// `frame_rate`, return the coarse tag unchanged.
    pub fn refined_timestamp(&self, period: u16, frame_rate: u16) -> Timestamp {
        let coarse = self.timestamp();
        if self.frame_type() != FrameType::DATA || period == 0 || frame_rate == 0 {
            return coarse;
        }

        let samples_per_frame = (f64::from(MAX_SAMPLE_COUNT) / f64::from(period)).floor();
        if samples_per_frame == 0.0 {
            return coarse;
        }
        let offset = f64::from(self.sample_count()) / samples_per_frame / f64::from(frame_rate);
        coarse.add_seconds(offset)
    }
}

fn require(buf: &[u8], start: usize, needed: usize) -> Result<()> {
    let available = buf.len().saturating_sub(start);
    if available < needed {
        return Err(FrameError::Incomplete { needed, available });
    }
    Ok(())
}
