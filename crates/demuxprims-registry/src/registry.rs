use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use demuxprims_frame::{BoxedFrame, FrameCandidate, FrameFactory, FrameIdentifier};

use crate::config::{DiscoveryPolicy, RegistryConfig};
use crate::error::{RegistryError, Result};

/// A registered frame type.
pub struct TypeDescriptor<I> {
    identifier: I,
    name: &'static str,
    factory: FrameFactory<I>,
}

impl<I: FrameIdentifier> TypeDescriptor<I> {
    pub fn identifier(&self) -> I {
        self.identifier
    }

    /// Name of the candidate this descriptor was built from.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Construct a fresh frame of this type.
    pub fn create(&self) -> demuxprims_frame::Result<BoxedFrame<I>> {
        (self.factory)()
    }
}

impl<I: fmt::Debug> fmt::Debug for TypeDescriptor<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("identifier", &self.identifier)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Identifier-keyed table of frame factories.
pub struct FrameTypeRegistry<I> {
    descriptors: Vec<TypeDescriptor<I>>,
    index: HashMap<I, usize>,
    config: RegistryConfig,
    started: bool,
}

impl<I: FrameIdentifier> FrameTypeRegistry<I> {
    /// Create an empty, stopped registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty, stopped registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            descriptors: Vec::new(),
            index: HashMap::new(),
            config,
            started: false,
        }
    }

    /// Discover and register `candidates`, returning how many types were registered.
    ///
    /// Each candidate is instantiated once to read its identifier. When two
    /// candidates expose the same identifier the first one wins. Candidates
    /// that fail or panic during construction, or expose no identifier, are
    /// skipped under
    /// [`DiscoveryPolicy::BestEffort`] and abort the start under
    /// [`DiscoveryPolicy::Strict`], leaving the registry empty and stopped.
    pub fn start(&mut self, candidates: &[FrameCandidate<I>]) -> Result<usize> {
        if self.started {
            return Err(RegistryError::AlreadyStarted);
        }

        for candidate in candidates {
            let identifier = match self.discover(candidate) {
                Ok(identifier) => identifier,
                Err(err) => match self.config.discovery_policy {
                    DiscoveryPolicy::BestEffort => {
                        tracing::warn!(error = %err, "skipping frame candidate");
                        continue;
                    }
                    DiscoveryPolicy::Strict => {
                        self.clear();
                        return Err(err);
                    }
                },
            };

            if let Some(&existing) = self.index.get(&identifier) {
                tracing::debug!(
                    identifier = %identifier,
                    kept = self.descriptors[existing].name,
                    ignored = candidate.name(),
                    "duplicate frame identifier"
                );
                continue;
            }

            self.index.insert(identifier, self.descriptors.len());
            self.descriptors.push(TypeDescriptor {
                identifier,
                name: candidate.name(),
                factory: candidate.factory().clone(),
            });
        }

        self.started = true;
        tracing::debug!(
            registered = self.descriptors.len(),
            offered = candidates.len(),
            "frame type registry started"
        );
        Ok(self.descriptors.len())
    }

    /// Clear the table; the registry can be started again.
    pub fn stop(&mut self) {
        self.clear();
    }

    /// Find the descriptor registered under `identifier`.
    pub fn lookup(&self, identifier: &I) -> Option<&TypeDescriptor<I>> {
        if self.config.optimize_parsing {
            self.index
                .get(identifier)
                .map(|&position| &self.descriptors[position])
        } else {
            self.descriptors
                .iter()
                .find(|descriptor| descriptor.identifier == *identifier)
        }
    }

    /// Alias of [`lookup`](Self::lookup).
    pub fn descriptor(&self, identifier: &I) -> Option<&TypeDescriptor<I>> {
        self.lookup(identifier)
    }

    /// Construct a fresh frame for `identifier`, if a type is registered.
    pub fn create(&self, identifier: &I) -> Option<demuxprims_frame::Result<BoxedFrame<I>>> {
        self.lookup(identifier).map(TypeDescriptor::create)
    }

    /// Check if an identifier has a registered type.
    pub fn contains(&self, identifier: &I) -> bool {
        self.lookup(identifier).is_some()
    }

    /// Registered identifiers in registration order.
    pub fn identifiers(&self) -> Vec<I> {
        self.descriptors
            .iter()
            .map(|descriptor| descriptor.identifier)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn discover(&self, candidate: &FrameCandidate<I>) -> Result<I> {
        let instance = panic::catch_unwind(AssertUnwindSafe(|| candidate.instantiate()))
            .map_err(|_| RegistryError::Discovery {
                candidate: candidate.name(),
                reason: "construction panicked".to_string(),
            })?
            .map_err(|err| RegistryError::Discovery {
                candidate: candidate.name(),
                reason: format!("construction failed: {err}"),
            })?;

        instance
            .identifier()
            .ok_or_else(|| RegistryError::Discovery {
                candidate: candidate.name(),
                reason: format!("no readable {} identifier", self.config.id_property_name),
            })
    }

    fn clear(&mut self) {
        self.descriptors.clear();
        self.index.clear();
        self.started = false;
    }
}

impl<I: FrameIdentifier> Default for FrameTypeRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}
