//! Fragmentation state and fragment reassembly.
//!
//! Protocols that split one logical frame across several wire images mark
//! each image with an "is first" and an "is last" flag. [`FragmentCollector`]
//! accepts those images in order and yields the combined body once the last
//! fragment arrives.

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::error::{FrameError, Result};

/// Position of one wire image within a fragmented logical frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentState {
    /// The image is a complete logical frame.
    Unfragmented,
    /// First of several images.
    First,
    /// Neither first nor last.
    Middle,
    /// Final image of a fragmented frame.
    Last,
}

impl FragmentState {
    pub fn from_flags(is_first: bool, is_last: bool) -> Self {
        match (is_first, is_last) {
            (true, true) => FragmentState::Unfragmented,
            (true, false) => FragmentState::First,
            (false, false) => FragmentState::Middle,
            (false, true) => FragmentState::Last,
        }
    }

    pub fn is_first(self) -> bool {
        matches!(self, FragmentState::Unfragmented | FragmentState::First)
    }

    pub fn is_last(self) -> bool {
        matches!(self, FragmentState::Unfragmented | FragmentState::Last)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FragmentState::Unfragmented => "unfragmented",
            FragmentState::First => "first",
            FragmentState::Middle => "middle",
            FragmentState::Last => "last",
        }
    }
}

/// Reassembles successive fragments that share one frame-count value.
#[derive(Debug, Default)]
pub struct FragmentCollector {
    frame_count: Option<u16>,
    combined: BytesMut,
    fragments: usize,
}

impl FragmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the next fragment body.
    ///
    /// Returns the combined body when `state` closes the logical frame, and
    /// `Ok(None)` while more fragments are expected. A `Middle` or `Last`
    /// fragment that does not continue the sequence in progress is rejected
    /// and clears the collector.
    pub fn push(&mut self, frame_count: u16, state: FragmentState, body: &[u8]) -> Result<Option<Bytes>> {
        match state {
            FragmentState::Unfragmented => {
                if self.is_collecting() {
                    tracing::debug!(
                        abandoned_fragments = self.fragments,
                        "unfragmented image replaced partial fragment sequence"
                    );
                }
                self.reset();
                Ok(Some(Bytes::copy_from_slice(body)))
            }
            FragmentState::First => {
                if self.is_collecting() {
                    tracing::debug!(
                        abandoned_fragments = self.fragments,
                        "new first fragment replaced partial fragment sequence"
                    );
                }
                self.reset();
                self.frame_count = Some(frame_count);
                self.append(body);
                Ok(None)
            }
            FragmentState::Middle | FragmentState::Last => {
                match self.frame_count {
                    Some(expected) if expected == frame_count => {}
                    Some(expected) => {
                        self.reset();
                        return Err(FrameError::Fragment(format!(
                            "fragment for frame count {frame_count} interrupts sequence {expected}"
                        )));
                    }
                    None => {
                        return Err(FrameError::Fragment(format!(
                            "{} fragment for frame count {frame_count} without a first fragment",
                            state.as_str()
                        )));
                    }
                }

                self.append(body);
                if state == FragmentState::Last {
                    let combined = std::mem::take(&mut self.combined).freeze();
                    self.reset();
                    return Ok(Some(combined));
                }
                Ok(None)
            }
        }
    }

    /// True while a sequence has started but not finished.
    pub fn is_collecting(&self) -> bool {
        self.frame_count.is_some()
    }

    /// Bytes accumulated for the sequence in progress.
    pub fn combined_len(&self) -> usize {
        self.combined.len()
    }

    /// Fragments accumulated for the sequence in progress.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Frame-count value shared by the sequence in progress.
    pub fn frame_count(&self) -> Option<u16> {
        self.frame_count
    }

    pub fn reset(&mut self) {
        self.frame_count = None;
        self.combined.clear();
        self.fragments = 0;
    }

    fn append(&mut self, body: &[u8]) {
        self.combined.extend_from_slice(body);
        self.fragments += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_four_states() {
        assert_eq!(FragmentState::from_flags(true, true), FragmentState::Unfragmented);
        assert_eq!(FragmentState::from_flags(true, false), FragmentState::First);
        assert_eq!(FragmentState::from_flags(false, false), FragmentState::Middle);
        assert_eq!(FragmentState::from_flags(false, true), FragmentState::Last);

        for state in [
            FragmentState::Unfragmented,
            FragmentState::First,
            FragmentState::Middle,
            FragmentState::Last,
        ] {
            assert_eq!(FragmentState::from_flags(state.is_first(), state.is_last()), state);
        }
    }

    #[test]
    fn unfragmented_passes_through() {
        let mut collector = FragmentCollector::new();
        let out = collector.push(3, FragmentState::Unfragmented, b"whole").unwrap();
        assert_eq!(out.as_deref(), Some(&b"whole"[..]));
        assert!(!collector.is_collecting());
    }

    #[test]
    fn collects_three_fragments() {
        let mut collector = FragmentCollector::new();
        assert!(collector.push(7, FragmentState::First, b"ab").unwrap().is_none());
        assert!(collector.push(7, FragmentState::Middle, b"cd").unwrap().is_none());
        assert_eq!(collector.combined_len(), 4);
        assert_eq!(collector.fragment_count(), 2);
        assert_eq!(collector.frame_count(), Some(7));

        let out = collector.push(7, FragmentState::Last, b"ef").unwrap();
        assert_eq!(out.as_deref(), Some(&b"abcdef"[..]));
        assert!(!collector.is_collecting());
        assert_eq!(collector.combined_len(), 0);
    }

    #[test]
    fn mismatched_count_is_rejected() {
        let mut collector = FragmentCollector::new();
        collector.push(1, FragmentState::First, b"x").unwrap();
        let err = collector.push(2, FragmentState::Last, b"y").unwrap_err();
        assert!(matches!(err, FrameError::Fragment(_)));
        assert!(!collector.is_collecting());
    }

    #[test]
    fn continuation_without_first_is_rejected() {
        let mut collector = FragmentCollector::new();
        let err = collector.push(4, FragmentState::Middle, b"x").unwrap_err();
        assert!(matches!(err, FrameError::Fragment(_)));
    }

    #[test]
    fn new_first_restarts_sequence() {
        let mut collector = FragmentCollector::new();
        collector.push(1, FragmentState::First, b"old").unwrap();
        collector.push(2, FragmentState::First, b"new").unwrap();
        let out = collector.push(2, FragmentState::Last, b"!").unwrap();
        assert_eq!(out.as_deref(), Some(&b"new!"[..]));
    }
}
