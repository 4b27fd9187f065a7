//! Seams between the protocol-agnostic dispatcher and protocol codecs.

use std::any::Any;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::Arc;

use crate::error::Result;
use crate::fragment::FragmentState;
use crate::timestamp::Timestamp;

/// Value read from a frame preamble that selects a registered frame type.
pub trait FrameIdentifier: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> FrameIdentifier for T where T: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static {}

/// Protocol-specific preamble reader used by the dispatcher.
pub trait HeaderCodec: Send + Sync {
    /// Type identifier carried in this protocol's preamble.
    type Id: FrameIdentifier;

    /// Short protocol name for diagnostics.
    fn name(&self) -> &'static str;

    /// Number of bytes needed before an identifier can be read.
    fn preamble_len(&self) -> usize;

    /// Read the type identifier at `start` without consuming anything.
    ///
    /// Fails with [`FrameError::Incomplete`](crate::FrameError::Incomplete)
    /// when fewer than [`preamble_len`](Self::preamble_len) bytes remain, or
    /// with a protocol error when the preamble is malformed.
    fn peek_identifier(&self, buf: &[u8], start: usize) -> Result<Self::Id>;
}

/// A frame object that initializes itself from a byte image.
pub trait DecodedFrame: Debug + Send + 'static {
    type Id: FrameIdentifier;

    /// The identifier this frame type is registered under.
    ///
    /// `None` means the type does not expose one and cannot be registered.
    fn identifier(&self) -> Option<Self::Id>;

    /// Decode one frame starting at `start`, returning the bytes consumed.
    fn consume(&mut self, buf: &[u8], start: usize) -> Result<usize>;

    /// Total wire length of the decoded frame, zero before `consume` succeeds.
    fn frame_length(&self) -> usize;

    /// Coarse time tag, when the protocol carries one.
    fn timestamp(&self) -> Option<Timestamp> {
        None
    }

    /// Fragment position reported by the preamble.
    fn fragment_state(&self) -> FragmentState {
        FragmentState::Unfragmented
    }

    /// Downcast hook for consumers that know the concrete frame type.
    fn as_any(&self) -> &dyn Any;
}

/// Boxed frame produced by a registry factory.
pub type BoxedFrame<I> = Box<dyn DecodedFrame<Id = I>>;

/// Constructor for one registrable frame type.
pub type FrameFactory<I> = Arc<dyn Fn() -> Result<BoxedFrame<I>> + Send + Sync>;

/// A frame implementation offered to the registry at start.
#[derive(Clone)]
pub struct FrameCandidate<I> {
    name: &'static str,
    factory: FrameFactory<I>,
}

impl<I: FrameIdentifier> FrameCandidate<I> {
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn() -> Result<BoxedFrame<I>> + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build a fresh, not yet consumed frame.
    pub fn instantiate(&self) -> Result<BoxedFrame<I>> {
        (self.factory)()
    }

    pub fn factory(&self) -> &FrameFactory<I> {
        &self.factory
    }
}

impl<I> Debug for FrameCandidate<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCandidate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
