/// Errors that can occur while decoding or building frame images.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Not enough bytes on hand to finish the frame; more may arrive later.
    #[error("incomplete frame ({available} bytes available, {needed} needed)")]
    Incomplete { needed: usize, available: usize },

    /// The preamble does not start with the protocol sync byte.
    #[error("invalid sync byte 0x{found:02X} (expected 0x{expected:02X})")]
    InvalidSync { expected: u8, found: u8 },

    /// The trailing CRC-CCITT does not match the frame contents.
    #[error("frame checksum is invalid (computed 0x{computed:04X}, received 0x{received:04X})")]
    ChecksumInvalid { computed: u16, received: u16 },

    /// A length or count field exceeds its protocol-defined range.
    #[error("{field} value {value} is outside the allowed range (max {max})")]
    Overflow {
        field: &'static str,
        value: usize,
        max: usize,
    },

    /// A length field is structurally impossible for the protocol.
    #[error("{field} value {value} is invalid: {reason}")]
    InvalidLength {
        field: &'static str,
        value: usize,
        reason: &'static str,
    },

    /// The preamble carries a type identifier other than the one this frame decodes.
    #[error("unexpected frame type {found} (expected {expected})")]
    UnexpectedType { expected: String, found: String },

    /// A decoder reported zero or out-of-range consumption.
    #[error("frame decoder made no progress at offset {offset}")]
    NoProgress { offset: usize },

    /// A fragment was offered out of sequence.
    #[error("fragment error: {0}")]
    Fragment(String),
}

impl FrameError {
    /// True when the failure may resolve once more bytes arrive from the same source.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, FrameError::Incomplete { .. })
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
