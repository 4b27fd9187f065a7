//! Frame images, checksums, time tags and codec traits for multi-source
//! frame demultiplexing.
//!
//! This is the shared vocabulary of demuxprims. Protocol crates implement
//! [`HeaderCodec`] and [`DecodedFrame`]; the dispatcher only ever sees those
//! traits plus the [`FrameBuffer`] images handed to it by source feeds.

pub mod buffer;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod fragment;
pub mod timestamp;

pub use buffer::{FrameBuffer, SourceId};
pub use checksum::{append_checksum, checksum_is_valid, crc_ccitt, verify_checksum, CHECKSUM_SIZE};
pub use codec::{
    BoxedFrame, DecodedFrame, FrameCandidate, FrameFactory, FrameIdentifier, HeaderCodec,
};
pub use error::{FrameError, Result};
pub use fragment::{FragmentCollector, FragmentState};
pub use timestamp::{TimeTagEpoch, Timestamp, NTP_EPOCH_THRESHOLD, NTP_UNIX_OFFSET_SECONDS};
