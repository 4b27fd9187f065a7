use std::fmt;
use std::ops::AddAssign;

use demuxprims_frame::{BoxedFrame, SourceId};
use serde::Serialize;

/// Result of parsing one frame image, delivered to an
/// [`OutcomeSink`](crate::OutcomeSink).
#[derive(Debug)]
pub enum ParseOutcome<I> {
    /// Frames decoded from the image, in byte order.
    Parsed {
        source: SourceId,
        frames: Vec<BoxedFrame<I>>,
    },
    /// The identifier at the cursor has no registered type. The rest of the
    /// image is dropped and the retry count is left alone.
    UnknownType {
        source: SourceId,
        identifier: I,
        discarded: usize,
    },
    /// Parsing stopped early and the remaining bytes were kept for the next
    /// image from the same source.
    Reused {
        source: SourceId,
        identifier: Option<I>,
        retained: usize,
        attempt: u32,
    },
    /// Parsing stopped early and the retry limit was exhausted.
    Discarded {
        source: SourceId,
        identifier: Option<I>,
        discarded: usize,
    },
}

impl<I: Copy> ParseOutcome<I> {
    pub fn source(&self) -> &SourceId {
        match self {
            Self::Parsed { source, .. }
            | Self::UnknownType { source, .. }
            | Self::Reused { source, .. }
            | Self::Discarded { source, .. } => source,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Parsed { .. } => OutcomeKind::Parsed,
            Self::UnknownType { .. } => OutcomeKind::UnknownType,
            Self::Reused { .. } => OutcomeKind::Reused,
            Self::Discarded { .. } => OutcomeKind::Discarded,
        }
    }

    /// Identifier the outcome refers to, if one was read.
    pub fn identifier(&self) -> Option<I> {
        match self {
            Self::Parsed { .. } => None,
            Self::UnknownType { identifier, .. } => Some(*identifier),
            Self::Reused { identifier, .. } | Self::Discarded { identifier, .. } => *identifier,
        }
    }

    /// Decoded frames, empty for anything but `Parsed`.
    pub fn frames(&self) -> &[BoxedFrame<I>] {
        match self {
            Self::Parsed { frames, .. } => frames,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Parsed,
    UnknownType,
    Reused,
    Discarded,
}

impl OutcomeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::UnknownType => "unknown_type",
            Self::Reused => "reused",
            Self::Discarded => "discarded",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one drain or batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainStats {
    /// Images pulled from the queue or batch.
    pub images: usize,
    /// Frames decoded across all images.
    pub frames: usize,
    pub unknown: usize,
    pub reused: usize,
    pub discarded: usize,
    /// Bytes dropped by unknown-type and discard outcomes.
    pub discarded_bytes: usize,
}

impl DrainStats {
    pub(crate) fn record<I>(&mut self, outcome: &ParseOutcome<I>) {
        match outcome {
            ParseOutcome::Parsed { frames, .. } => self.frames += frames.len(),
            ParseOutcome::UnknownType { discarded, .. } => {
                self.unknown += 1;
                self.discarded_bytes += discarded;
            }
            ParseOutcome::Reused { .. } => self.reused += 1,
            ParseOutcome::Discarded { discarded, .. } => {
                self.discarded += 1;
                self.discarded_bytes += discarded;
            }
        }
    }

    /// True when no bytes were lost to unknown types or exhausted retries.
    pub fn is_lossless(&self) -> bool {
        self.unknown == 0 && self.discarded == 0
    }
}

impl AddAssign for DrainStats {
    fn add_assign(&mut self, other: Self) {
        self.images += other.images;
        self.frames += other.frames;
        self.unknown += other.unknown;
        self.reused += other.reused;
        self.discarded += other.discarded;
        self.discarded_bytes += other.discarded_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_accumulate() {
        let mut stats = DrainStats::default();
        stats.record(&ParseOutcome::<u8>::UnknownType {
            source: SourceId::from("a"),
            identifier: 3,
            discarded: 10,
        });
        stats.record(&ParseOutcome::<u8>::Reused {
            source: SourceId::from("a"),
            identifier: None,
            retained: 4,
            attempt: 1,
        });
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.discarded_bytes, 10);
        assert!(!stats.is_lossless());

        let mut total = DrainStats::default();
        total += stats;
        total += stats;
        assert_eq!(total.unknown, 2);
        assert_eq!(total.discarded_bytes, 20);
    }

    #[test]
    fn outcome_accessors() {
        let outcome = ParseOutcome::<u8>::Discarded {
            source: SourceId::from("pmu"),
            identifier: Some(9),
            discarded: 2,
        };
        assert_eq!(outcome.source().as_str(), "pmu");
        assert_eq!(outcome.kind(), OutcomeKind::Discarded);
        assert_eq!(outcome.identifier(), Some(9));
        assert!(outcome.frames().is_empty());
        assert_eq!(
            serde_json::to_string(&OutcomeKind::UnknownType).unwrap(),
            "\"unknown_type\""
        );
    }
}
