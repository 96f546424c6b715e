use thiserror::Error;

/// Errors raised by the mention store and directory layers.
#[derive(Debug, Error)]
pub enum MentionError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, file locking, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Content type or character name rejected before reaching storage.
    #[error("invalid input: {0}")]
    Invalid(#[from] crate::validation::ValidationError),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },
}
