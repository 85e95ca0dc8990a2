//! Denormalization Engine Error Hierarchy
//!
//! Defines error types for the denormalization engine, categorized by
//! operational concern: backing-store access, watcher registration and
//! configuration loading.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backing-store access failures (reads during dispatch, writes during
    /// batch commit)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Malformed watcher registrations, rejected at registration time
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Documents must be mappings at the top level
    #[error("Collection '{collection}': document is not a mapping")]
    NotADocument { collection: String },

    /// Document identifiers must be strings
    #[error("Collection '{collection}': document id is not a string")]
    InvalidId { collection: String },

    /// Insert with an id that is already present
    #[error("Collection '{collection}': duplicate document id '{id}'")]
    DuplicateId { collection: String, id: String },

    /// Failure reported by an external backing store
    #[error("Collection '{collection}': backend error: {message}")]
    Backend { collection: String, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    /// Watched field paths must be non-empty strings
    #[error("Watched field path is empty")]
    EmptyPath,

    /// A dotted path such as "a..b" contains an empty segment
    #[error("Watched field path '{path}' contains an empty segment")]
    EmptySegment { path: String },
}

#[cfg(test)]
mod errors_test {
    use super::*;

    #[test]
    fn test_error_display_keeps_collection_context() {
        let e = Error::from(StoreError::DuplicateId {
            collection: "posts".to_string(),
            id: "post1".to_string(),
        });
        assert_eq!(e.to_string(), "Collection 'posts': duplicate document id 'post1'");
    }

    #[test]
    fn test_registration_error_names_offending_path() {
        let e = Error::from(RegistrationError::EmptySegment {
            path: "author..name".to_string(),
        });
        assert!(e.to_string().contains("author..name"));
    }
}
