//! The per-batch parse loop.

use bytes::Bytes;
use demuxprims_frame::{
    BoxedFrame, FrameBuffer, FrameError, FrameIdentifier, HeaderCodec, SourceId,
};
use demuxprims_registry::FrameTypeRegistry;

use crate::outcome::{DrainStats, ParseOutcome};
use crate::reuse::{ReuseDecision, ReuseTracker};
use crate::sink::OutcomeSink;

/// Why parsing of one image stopped before its end.
enum Stop<I> {
    Unknown(I),
    Failed {
        identifier: Option<I>,
        error: FrameError,
    },
}

/// Parse `batch` in order, delivering outcomes to `sink`.
///
/// Bytes held for a source from an earlier batch are placed in front of that
/// source's first image here. When an image stops short and the retry limit
/// allows, its remaining bytes go in front of the next image from the same
/// source in this batch, or are held in `tracker` if there is none. A held
/// remainder is never parsed on its own.
pub fn parse_batch<C, S>(
    codec: &C,
    registry: &FrameTypeRegistry<C::Id>,
    tracker: &mut ReuseTracker,
    mut batch: Vec<FrameBuffer>,
    sink: &mut S,
) -> DrainStats
where
    C: HeaderCodec,
    S: OutcomeSink<C::Id> + ?Sized,
{
    let mut stats = DrainStats {
        images: batch.len(),
        ..DrainStats::default()
    };

    for image in batch.iter_mut() {
        if let Some(tail) = tracker.take_tail(image.source()) {
            tracing::trace!(source = %image.source(), held = tail.len(), "prepending held bytes");
            image.prepend(&tail);
        }
    }

    for position in 0..batch.len() {
        let source = batch[position].source().clone();
        let bytes = batch[position].bytes().clone();
        let (frames, cursor, stop) = parse_image(codec, registry, tracker, &source, &bytes);

        if let Some(stop) = stop {
            let outcome = match stop {
                Stop::Unknown(identifier) => {
                    tracing::debug!(
                        source = %source,
                        identifier = %identifier,
                        offset = cursor,
                        "no registered frame type"
                    );
                    ParseOutcome::UnknownType {
                        source: source.clone(),
                        identifier,
                        discarded: bytes.len() - cursor,
                    }
                }
                Stop::Failed { identifier, error } => {
                    let tail = bytes.slice(cursor..);
                    match tracker.record_failure(&source) {
                        ReuseDecision::Reuse { attempt } => {
                            tracing::debug!(
                                source = %source,
                                error = %error,
                                retained = tail.len(),
                                attempt,
                                "keeping unparsed bytes"
                            );
                            let retained = tail.len();
                            carry_tail(&mut batch[position + 1..], tracker, &source, tail);
                            ParseOutcome::Reused {
                                source: source.clone(),
                                identifier,
                                retained,
                                attempt,
                            }
                        }
                        ReuseDecision::Discard => {
                            tracing::warn!(
                                source = %source,
                                error = %error,
                                discarded = tail.len(),
                                "discarding unparsed bytes after retry limit"
                            );
                            ParseOutcome::Discarded {
                                source: source.clone(),
                                identifier,
                                discarded: tail.len(),
                            }
                        }
                    }
                }
            };
            stats.record(&outcome);
            sink.deliver(outcome);
        }

        if !frames.is_empty() {
            let outcome = ParseOutcome::Parsed { source, frames };
            stats.record(&outcome);
            sink.deliver(outcome);
        }
    }

    stats
}

/// Decode frames from `bytes` until the end or the first stop condition.
///
/// Returns the decoded frames, the cursor where parsing stopped and the
/// reason it stopped early, if it did.
fn parse_image<C: HeaderCodec>(
    codec: &C,
    registry: &FrameTypeRegistry<C::Id>,
    tracker: &mut ReuseTracker,
    source: &SourceId,
    bytes: &[u8],
) -> (Vec<BoxedFrame<C::Id>>, usize, Option<Stop<C::Id>>) {
    let mut frames = Vec::new();
    let mut cursor = 0;

    while cursor < bytes.len() {
        let available = bytes.len() - cursor;
        let needed = codec.preamble_len();
        if available < needed {
            let stop = Stop::Failed {
                identifier: None,
                error: FrameError::Incomplete { needed, available },
            };
            return (frames, cursor, Some(stop));
        }

        let identifier = match codec.peek_identifier(bytes, cursor) {
            Ok(identifier) => identifier,
            Err(error) => {
                let stop = Stop::Failed {
                    identifier: None,
                    error,
                };
                return (frames, cursor, Some(stop));
            }
        };

        let Some(descriptor) = registry.lookup(&identifier) else {
            return (frames, cursor, Some(Stop::Unknown(identifier)));
        };

        let decoded = descriptor.create().and_then(|mut frame| {
            let consumed = consume_checked(&mut frame, bytes, cursor)?;
            Ok((frame, consumed))
        });

        match decoded {
            Ok((frame, consumed)) => {
                tracing::trace!(
                    source = %source,
                    identifier = %identifier,
                    offset = cursor,
                    length = consumed,
                    "decoded frame"
                );
                cursor += consumed;
                frames.push(frame);
                tracker.record_success(source);
            }
            Err(error) => {
                let stop = Stop::Failed {
                    identifier: Some(identifier),
                    error,
                };
                return (frames, cursor, Some(stop));
            }
        }
    }

    (frames, cursor, None)
}

/// Run `consume` and reject results that would stall or overrun the cursor.
fn consume_checked<I: FrameIdentifier>(
    frame: &mut BoxedFrame<I>,
    bytes: &[u8],
    cursor: usize,
) -> demuxprims_frame::Result<usize> {
    let consumed = frame.consume(bytes, cursor)?;
    if consumed == 0 || consumed > bytes.len() - cursor {
        return Err(FrameError::NoProgress { offset: cursor });
    }
    Ok(consumed)
}

fn carry_tail(
    rest: &mut [FrameBuffer],
    tracker: &mut ReuseTracker,
    source: &SourceId,
    tail: Bytes,
) {
    match rest.iter_mut().find(|image| image.source() == source) {
        Some(next) => next.prepend(&tail),
        None => tracker.hold_tail(source, tail),
    }
}
