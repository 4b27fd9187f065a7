//! Frame header codecs for two synchrophasor protocol generations.
//!
//! - [`ieee1344`] — 6-byte preamble: 32-bit second of century plus a
//!   bit-packed sample word carrying frame type, fragment flags and count.
//! - [`pdcstream`] — 4-byte preamble: sync byte, packet number and a word
//!   count, with an optional legacy single-byte word count.
//!
//! Both close every frame with a big-endian CRC-CCITT. Each module exposes a
//! [`HeaderCodec`](demuxprims_frame::HeaderCodec) implementation for the
//! dispatcher and a `candidates` list for the frame type registry.

pub mod ieee1344;
pub mod pdcstream;

pub use ieee1344::Ieee1344Codec;
pub use pdcstream::{ParsingOptions, PdcStreamCodec};
