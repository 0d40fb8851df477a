//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A thread panicked while holding the registry lock
    #[error("connection registry lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for RegistryError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        RegistryError::Poisoned
    }
}
