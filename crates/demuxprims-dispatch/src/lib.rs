//! Multi-source frame dispatch.
//!
//! A [`Dispatcher`] collects byte images from many sources, splits each image
//! into frames with a [`HeaderCodec`](demuxprims_frame::HeaderCodec) and a
//! registry of frame types, and reports one [`ParseOutcome`] per result.
//!
//! Images may end in the middle of a frame. The unparsed remainder is carried
//! into the next image from the same source, up to
//! [`ParserConfig::unparsed_data_reuse_limit`] consecutive times, after which
//! it is discarded.
//!
//! ```
//! use demuxprims_dispatch::{Dispatcher, ParserConfig};
//! use demuxprims_protocols::ieee1344::{self, CommonFrameHeader, FrameType};
//! use demuxprims_protocols::Ieee1344Codec;
//!
//! let dispatcher = Dispatcher::new(Ieee1344Codec, ParserConfig::default())?;
//! dispatcher.start(&ieee1344::candidates())?;
//!
//! let image = ieee1344::encode_frame(CommonFrameHeader::new(FrameType::DATA, 0), b"abc")?;
//! dispatcher.enqueue("pmu-1", image)?;
//!
//! let mut outcomes = Vec::new();
//! let stats = dispatcher.drain(&mut outcomes)?;
//! assert_eq!(stats.frames, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod outcome;
pub mod parse;
pub mod reuse;
pub mod sink;

pub use config::{ParserConfig, DEFAULT_UNPARSED_DATA_REUSE_LIMIT};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, Result};
pub use outcome::{DrainStats, OutcomeKind, ParseOutcome};
pub use parse::parse_batch;
pub use reuse::{ReuseDecision, ReuseTracker};
pub use sink::{FnSink, NullSink, OutcomeSink};

pub use demuxprims_registry::DiscoveryPolicy;
