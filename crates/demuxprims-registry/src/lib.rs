//! Identifier-keyed frame type registry.
//!
//! Built once at start from an explicit list of
//! [`FrameCandidate`](demuxprims_frame::FrameCandidate)s: each candidate is
//! instantiated once, its identifier read, and its factory registered under
//! that identifier. The dispatcher consults the registry for every frame it
//! meets.

pub mod config;
pub mod error;
pub mod registry;

pub use config::{DiscoveryPolicy, RegistryConfig, DEFAULT_ID_PROPERTY_NAME};
pub use error::{RegistryError, Result};
pub use registry::{FrameTypeRegistry, TypeDescriptor};
