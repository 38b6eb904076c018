//! Error types for the store layer.

/// Errors that can occur while reading or patching room records.
///
/// Callers in the room layer never let these reach a client: they are
/// logged and the triggering handler moves on.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The MongoDB driver reported a failure (connect, query, or decode).
    #[cfg(feature = "mongodb")]
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// The store could not be reached at all.
    #[error("room store unavailable: {0}")]
    Unavailable(String),
}
