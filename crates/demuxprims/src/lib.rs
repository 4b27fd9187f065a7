//! Multi-source demultiplexing of checksummed binary frame streams.
//!
//! demuxprims splits raw byte images arriving from many sources into typed
//! frames, carrying partial frames across image boundaries per source and
//! discarding bytes that never resolve.
//!
//! # Crate Structure
//!
//! - [`frame`] — Frame images, CRC-CCITT checksums, time tags and codec traits
//! - [`protocols`] — IEEE 1344 and PDCstream style header codecs
//! - [`registry`] — Identifier-keyed frame type registry
//! - [`dispatch`] — Ingest queue, parse loop and per-source retry tracking

/// Re-export frame types.
pub mod frame {
    pub use demuxprims_frame::*;
}

/// Re-export protocol codecs.
pub mod protocols {
    pub use demuxprims_protocols::*;
}

/// Re-export registry types.
pub mod registry {
    pub use demuxprims_registry::*;
}

/// Re-export dispatcher types.
pub mod dispatch {
    pub use demuxprims_dispatch::*;
}
