use thiserror::Error;

/// Errors raised by a [`MemberStore`](crate::store::MemberStore) implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A member with {field} '{value}' already exists")]
    Conflict { field: &'static str, value: String },

    #[error("Record not found")]
    NotFound,

    #[error("Storage backend failure: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(error))
    }
}

/// Errors surfaced by ring traversal and check runs
#[derive(Debug, Error)]
pub enum RingError {
    /// The domain does not belong to any eligible member
    #[error("No such member in the ring: {0}")]
    NotFound(String),

    /// Nothing is eligible, so next/previous are undefined
    #[error("The ring has no eligible members")]
    EmptyRing,

    #[error("A check run is already in progress")]
    RunInProgress,

    #[error(transparent)]
    Store(#[from] StoreError),
}
