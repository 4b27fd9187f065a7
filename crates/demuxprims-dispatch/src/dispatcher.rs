use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use demuxprims_frame::{FrameBuffer, FrameCandidate, HeaderCodec, SourceId};
use demuxprims_registry::{FrameTypeRegistry, RegistryError};

use crate::config::ParserConfig;
use crate::error::{DispatchError, Result};
use crate::outcome::DrainStats;
use crate::parse::parse_batch;
use crate::reuse::ReuseTracker;
use crate::sink::OutcomeSink;

struct Session<I> {
    registry: FrameTypeRegistry<I>,
    tracker: ReuseTracker,
}

/// Accepts frame images from many sources and parses them in arrival order.
///
/// `enqueue` may be called from any number of threads. Drains are serialized
/// so the registry and per-source retry state are only touched by one
/// parse pass at a time.
pub struct Dispatcher<C: HeaderCodec> {
    codec: C,
    config: ParserConfig,
    queue: Mutex<VecDeque<FrameBuffer>>,
    next_order: AtomicU64,
    session: Mutex<Session<C::Id>>,
}

impl<C: HeaderCodec> Dispatcher<C> {
    /// Create a stopped dispatcher after validating `config`.
    pub fn new(codec: C, config: ParserConfig) -> Result<Self> {
        config.validate()?;
        let session = Session {
            registry: FrameTypeRegistry::with_config(config.registry_config()),
            tracker: ReuseTracker::new(config.unparsed_data_reuse_limit),
        };
        Ok(Self {
            codec,
            config,
            queue: Mutex::new(VecDeque::new()),
            next_order: AtomicU64::new(0),
            session: Mutex::new(session),
        })
    }

    /// Build the frame type registry from `candidates`.
    ///
    /// Returns how many frame types were registered.
    pub fn start(&self, candidates: &[FrameCandidate<C::Id>]) -> Result<usize> {
        let mut session = lock(&self.session);
        let registered = session.registry.start(candidates)?;
        tracing::debug!(
            codec = self.codec.name(),
            registered,
            "dispatcher started"
        );
        Ok(registered)
    }

    /// Clear the registry, retry counts and held bytes. Queued images stay.
    pub fn stop(&self) {
        let mut session = lock(&self.session);
        session.registry.stop();
        session.tracker.clear();
        tracing::debug!(codec = self.codec.name(), "dispatcher stopped");
    }

    pub fn is_started(&self) -> bool {
        lock(&self.session).registry.is_started()
    }

    /// Queue one image from `source`, returning its arrival order.
    pub fn enqueue(&self, source: impl Into<SourceId>, bytes: impl Into<Bytes>) -> Result<u64> {
        let source = source.into();
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(DispatchError::EmptyImage { source_id: source });
        }

        let mut queue = lock(&self.queue);
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        queue.push_back(FrameBuffer::new(source, bytes, order));
        Ok(order)
    }

    /// Images waiting for the next drain.
    pub fn queued_len(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Parse one batch of queued images.
    ///
    /// Takes at most `max_batch_size` images, or everything queued when no
    /// limit is set. Returns default stats when nothing is queued.
    pub fn drain<S>(&self, sink: &mut S) -> Result<DrainStats>
    where
        S: OutcomeSink<C::Id> + ?Sized,
    {
        let mut session = lock(&self.session);
        if !session.registry.is_started() {
            return Err(RegistryError::NotStarted.into());
        }

        let batch: Vec<FrameBuffer> = {
            let mut queue = lock(&self.queue);
            let take = self
                .config
                .max_batch_size
                .map_or(queue.len(), |limit| limit.min(queue.len()));
            queue.drain(..take).collect()
        };
        if batch.is_empty() {
            return Ok(DrainStats::default());
        }

        let Session { registry, tracker } = &mut *session;
        let stats = parse_batch(&self.codec, registry, tracker, batch, sink);
        tracing::debug!(
            images = stats.images,
            frames = stats.frames,
            reused = stats.reused,
            discarded = stats.discarded,
            unknown = stats.unknown,
            "drained batch"
        );
        Ok(stats)
    }

    /// Drain repeatedly until the queue is empty.
    pub fn drain_all<S>(&self, sink: &mut S) -> Result<DrainStats>
    where
        S: OutcomeSink<C::Id> + ?Sized,
    {
        let mut total = DrainStats::default();
        loop {
            let stats = self.drain(sink)?;
            if stats.images == 0 {
                return Ok(total);
            }
            total += stats;
        }
    }

    /// Parse an explicit batch, bypassing the queue.
    ///
    /// Images are parsed in the given order and share retry state with
    /// queued images from the same sources.
    pub fn process_batch<S>(&self, batch: Vec<FrameBuffer>, sink: &mut S) -> Result<DrainStats>
    where
        S: OutcomeSink<C::Id> + ?Sized,
    {
        if batch.is_empty() {
            return Err(DispatchError::EmptyBatch);
        }
        if let Some(image) = batch.iter().find(|image| image.is_empty()) {
            return Err(DispatchError::EmptyImage {
                source_id: image.source().clone(),
            });
        }

        let mut session = lock(&self.session);
        if !session.registry.is_started() {
            return Err(RegistryError::NotStarted.into());
        }
        let Session { registry, tracker } = &mut *session;
        Ok(parse_batch(&self.codec, registry, tracker, batch, sink))
    }

    /// Consecutive failed attempts recorded for `source`.
    pub fn retry_count(&self, source: &SourceId) -> u32 {
        lock(&self.session).tracker.retry_count(source)
    }

    /// Bytes held for `source` until its next image arrives.
    pub fn pending_tail_len(&self, source: &SourceId) -> usize {
        lock(&self.session).tracker.pending_tail_len(source)
    }

    /// Identifiers currently registered, in registration order.
    pub fn registered_identifiers(&self) -> Vec<C::Id> {
        lock(&self.session).registry.identifiers()
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
