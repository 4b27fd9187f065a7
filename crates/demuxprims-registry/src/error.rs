/// Errors that can occur while building or using the frame type registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A candidate frame type could not be registered.
    #[error("discovery failed for {candidate}: {reason}")]
    Discovery {
        candidate: &'static str,
        reason: String,
    },

    /// `start` was called on a registry that is already started.
    #[error("frame type registry already started")]
    AlreadyStarted,

    /// The registry was used before `start`.
    #[error("frame type registry not started")]
    NotStarted,
}

pub type Result<T> = std::result::Result<T, RegistryError>;
