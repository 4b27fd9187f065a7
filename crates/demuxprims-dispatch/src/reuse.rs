use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use demuxprims_frame::SourceId;

/// What to do with bytes left over after a failed parse attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseDecision {
    /// Keep the bytes; `attempt` is the new retry count (1-based).
    Reuse { attempt: u32 },
    /// The limit is exhausted; drop the bytes. The count is reset.
    Discard,
}

#[derive(Debug, Default)]
struct SourceState {
    retry_count: u32,
    pending_tail: Option<Bytes>,
}

impl SourceState {
    fn is_idle(&self) -> bool {
        self.retry_count == 0 && self.pending_tail.is_none()
    }
}

/// Per-source retry counters and held leftover bytes.
///
/// Entries are created on first failure and dropped once a source has no
/// retry count and no held bytes.
#[derive(Debug)]
pub struct ReuseTracker {
    limit: u32,
    sources: HashMap<SourceId, SourceState>,
}

impl ReuseTracker {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            sources: HashMap::new(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Consecutive failed attempts recorded for `source`.
    pub fn retry_count(&self, source: &SourceId) -> u32 {
        self.sources.get(source).map_or(0, |state| state.retry_count)
    }

    /// Reset the retry count after a frame from `source` decoded.
    pub fn record_success(&mut self, source: &SourceId) {
        if let Some(state) = self.sources.get_mut(source) {
            state.retry_count = 0;
            if state.is_idle() {
                self.sources.remove(source);
            }
        }
    }

    /// Count a failed attempt and decide whether its bytes are kept.
    pub fn record_failure(&mut self, source: &SourceId) -> ReuseDecision {
        let state = self.sources.entry(source.clone()).or_default();
        if state.retry_count < self.limit {
            state.retry_count += 1;
            ReuseDecision::Reuse {
                attempt: state.retry_count,
            }
        } else {
            state.retry_count = 0;
            if state.is_idle() {
                self.sources.remove(source);
            }
            ReuseDecision::Discard
        }
    }

    /// Hold `tail` until the next image from `source` arrives.
    pub fn hold_tail(&mut self, source: &SourceId, tail: Bytes) {
        let state = self.sources.entry(source.clone()).or_default();
        state.pending_tail = Some(match state.pending_tail.take() {
            Some(held) => {
                let mut merged = BytesMut::with_capacity(held.len() + tail.len());
                merged.extend_from_slice(&held);
                merged.extend_from_slice(&tail);
                merged.freeze()
            }
            None => tail,
        });
    }

    /// Remove and return the bytes held for `source`.
    pub fn take_tail(&mut self, source: &SourceId) -> Option<Bytes> {
        let state = self.sources.get_mut(source)?;
        let tail = state.pending_tail.take();
        if state.is_idle() {
            self.sources.remove(source);
        }
        tail
    }

    pub fn pending_tail_len(&self, source: &SourceId) -> usize {
        self.sources
            .get(source)
            .and_then(|state| state.pending_tail.as_ref())
            .map_or(0, Bytes::len)
    }

    /// Number of sources with a retry count or held bytes.
    pub fn tracked_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_up_to_limit_are_reused() {
        let source = SourceId::from("pmu");
        let mut tracker = ReuseTracker::new(2);

        assert_eq!(tracker.record_failure(&source), ReuseDecision::Reuse { attempt: 1 });
        assert_eq!(tracker.record_failure(&source), ReuseDecision::Reuse { attempt: 2 });
        assert_eq!(tracker.record_failure(&source), ReuseDecision::Discard);
        assert_eq!(tracker.retry_count(&source), 0);
        assert_eq!(tracker.tracked_sources(), 0);
    }

    #[test]
    fn zero_limit_discards_immediately() {
        let source = SourceId::from("pmu");
        let mut tracker = ReuseTracker::new(0);
        assert_eq!(tracker.record_failure(&source), ReuseDecision::Discard);
    }

    #[test]
    fn success_resets_count() {
        let source = SourceId::from("pmu");
        let mut tracker = ReuseTracker::new(5);
        tracker.record_failure(&source);
        tracker.record_failure(&source);
        tracker.record_success(&source);
        assert_eq!(tracker.retry_count(&source), 0);
        assert_eq!(tracker.record_failure(&source), ReuseDecision::Reuse { attempt: 1 });
    }

    #[test]
    fn sources_are_independent() {
        let a = SourceId::from("a");
        let b = SourceId::from("b");
        let mut tracker = ReuseTracker::new(1);
        tracker.record_failure(&a);
        assert_eq!(tracker.retry_count(&a), 1);
        assert_eq!(tracker.retry_count(&b), 0);
        assert_eq!(tracker.record_failure(&b), ReuseDecision::Reuse { attempt: 1 });
    }

    #[test]
    fn held_tails_concatenate_and_drain() {
        let source = SourceId::from("pmu");
        let mut tracker = ReuseTracker::new(5);
        tracker.hold_tail(&source, Bytes::from_static(b"ab"));
        tracker.hold_tail(&source, Bytes::from_static(b"cd"));
        assert_eq!(tracker.pending_tail_len(&source), 4);

        assert_eq!(tracker.take_tail(&source).unwrap().as_ref(), b"abcd");
        assert!(tracker.take_tail(&source).is_none());
        assert_eq!(tracker.tracked_sources(), 0);
    }
}
