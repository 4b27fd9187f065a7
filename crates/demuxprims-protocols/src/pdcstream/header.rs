use std::fmt;

use bytes::{BufMut, BytesMut};
use demuxprims_frame::{FrameError, Result, TimeTagEpoch, Timestamp, CHECKSUM_SIZE};
use serde::{Deserialize, Serialize};

/// Every PDCstream frame starts with this byte.
pub const SYNC_BYTE: u8 = 0xAA;

/// Preamble: sync (1) + packet number (1) + word count (2) = 4 bytes.
pub const PREAMBLE_LENGTH: usize = 4;

/// Offset of the second-of-century field in data frames.
pub const TIMESTAMP_OFFSET: usize = PREAMBLE_LENGTH;

pub const MIN_FRAME_LENGTH: usize = PREAMBLE_LENGTH + CHECKSUM_SIZE;

pub const MAX_FRAME_LENGTH: usize = 2 * u16::MAX as usize;

/// Largest word count a legacy single-byte field can carry.
pub const MAX_LEGACY_WORD_COUNT: u16 = u8::MAX as u16;

/// Frame kinds distinguished by the packet number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// Packet number 0.
    Configuration,
    /// Any non-zero packet number.
    Data,
}

impl FrameKind {
    pub const fn from_packet_number(packet_number: u8) -> Self {
        if packet_number == 0 {
            FrameKind::Configuration
        } else {
            FrameKind::Data
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Configuration => "configuration",
            FrameKind::Data => "data",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options that change how preambles are read.
///
/// Passed explicitly to every decode call; nothing is inferred from the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingOptions {
    /// Read the word count from the single byte at offset 3, ignoring offset 2.
    ///
    /// Older encoders wrote an unreliable high byte.
    pub legacy_word_count: bool,
}

/// Common header shared by every PDCstream frame.
///
/// ```text
/// ┌────────┬─────────────┬────────────────┬──────────────┬──────────┐
/// │ 0xAA   │ Packet no.  │ Word count     │ Body         │ CRC      │
/// │ (1B)   │ (1B)        │ (2B BE)        │              │ (2B BE)  │
/// └────────┴─────────────┴────────────────┴──────────────┴──────────┘
/// ```
///
/// The frame length is twice the word count. Data frames open their body
/// with a 4-byte big-endian second of century.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommonFrameHeader {
    packet_number: u8,
    word_count: u16,
    time_tag: Option<(Timestamp, TimeTagEpoch)>,
}

impl CommonFrameHeader {
    /// Header with the minimum frame length.
    pub const fn new(packet_number: u8) -> Self {
        Self {
            packet_number,
            word_count: (MIN_FRAME_LENGTH / 2) as u16,
            time_tag: None,
        }
    }

    /// Validate the sync byte and read the frame kind at `start`.
    pub fn peek_kind(buf: &[u8], start: usize) -> Result<FrameKind> {
        require(buf, start, PREAMBLE_LENGTH)?;
        check_sync(buf[start])?;
        Ok(FrameKind::from_packet_number(buf[start + 1]))
    }

    /// Decode the preamble at `start`.
    ///
    /// When the frame is a data frame at least eight bytes long and those
    /// bytes are on hand, the second of century is read and interpreted with
    /// [`Timestamp::from_second_of_century`].
    pub fn decode(buf: &[u8], start: usize, options: ParsingOptions) -> Result<Self> {
        require(buf, start, PREAMBLE_LENGTH)?;
        check_sync(buf[start])?;

        let packet_number = buf[start + 1];
        let word_count = if options.legacy_word_count {
            u16::from(buf[start + 3])
        } else {
            u16::from_be_bytes([buf[start + 2], buf[start + 3]])
        };

        let frame_length = 2 * usize::from(word_count);
        if frame_length < MIN_FRAME_LENGTH {
            return Err(FrameError::InvalidLength {
                field: "frame length",
                value: frame_length,
                reason: "shorter than preamble plus checksum",
            });
        }

        let mut header = Self {
            packet_number,
            word_count,
            time_tag: None,
        };

        let soc_end = start + TIMESTAMP_OFFSET + 4;
        if header.kind() == FrameKind::Data
            && header.frame_length() >= TIMESTAMP_OFFSET + 4
            && buf.len() >= soc_end
        {
            let at = &buf[start + TIMESTAMP_OFFSET..soc_end];
            let soc = u32::from_be_bytes([at[0], at[1], at[2], at[3]]);
            header.time_tag = Some(Timestamp::from_second_of_century(soc));
        }

        Ok(header)
    }

    /// Write the preamble.
    pub fn encode(&self, dst: &mut BytesMut, options: ParsingOptions) -> Result<()> {
        dst.reserve(PREAMBLE_LENGTH);
        dst.put_u8(SYNC_BYTE);
        dst.put_u8(self.packet_number);
        if options.legacy_word_count {
            if self.word_count > MAX_LEGACY_WORD_COUNT {
                return Err(FrameError::Overflow {
                    field: "legacy word count",
                    value: usize::from(self.word_count),
                    max: usize::from(MAX_LEGACY_WORD_COUNT),
                });
            }
            dst.put_u8(0);
            dst.put_u8(self.word_count as u8);
        } else {
            dst.put_u16(self.word_count);
        }
        Ok(())
    }

    pub const fn packet_number(&self) -> u8 {
        self.packet_number
    }

    pub const fn kind(&self) -> FrameKind {
        FrameKind::from_packet_number(self.packet_number)
    }

    pub const fn word_count(&self) -> u16 {
        self.word_count
    }

    pub const fn frame_length(&self) -> usize {
        2 * self.word_count as usize
    }

    /// Coarse time tag of a data frame, if enough bytes were available at decode.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.time_tag.map(|(timestamp, _)| timestamp)
    }

    /// Which epoch the time tag was read against.
    pub fn time_tag_epoch(&self) -> Option<TimeTagEpoch> {
        self.time_tag.map(|(_, epoch)| epoch)
    }

    pub const fn with_packet_number(mut self, packet_number: u8) -> Self {
        self.packet_number = packet_number;
        self
    }

    /// Set the frame length in bytes; it must be even and within range.
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
                reason: "shorter than preamble plus checksum",
            });
        }
        if frame_length % 2 != 0 {
            return Err(FrameError::InvalidLength {
                field: "frame length",
                value: frame_length,
                reason: "not a whole number of 16-bit words",
            });
        }
        self.word_count = (frame_length / 2) as u16;
        Ok(self)
    }
}

fn check_sync(found: u8) -> Result<()> {
    if found != SYNC_BYTE {
        return Err(FrameError::InvalidSync {
            expected: SYNC_BYTE,
            found,
        });
    }
    Ok(())
}

fn require(buf: &[u8], start: usize, needed: usize) -> Result<()> {
    let available = buf.len().saturating_sub(start);
    if available < needed {
        return Err(FrameError::Incomplete { needed, available });
    }
    Ok(())
}
