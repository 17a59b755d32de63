//! Error taxonomy shared by the persistence layer, the goal store and the
//! HTTP client.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by goal store operations.
///
/// Every variant leaves the caller's state untouched: a failed write is
/// never partially applied.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The input breaks a data invariant (category count, required fields,
    /// progress range, non-dense reorder batch).
    #[error("{0}")]
    Validation(String),

    /// The referenced goal, sub-goal, note or category does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation collides with existing data, e.g. deleting a category
    /// that goals still reference.
    #[error("{0}")]
    Conflict(String),

    /// The persistence collaborator failed or could not be reached.
    #[error("persistence failure: {0}")]
    Transport(#[source] anyhow::Error),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Transport(_) => "transport",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Transport(e.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Transport(e.into())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.into())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(e: anyhow::Error) -> Self {
        Self::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = StoreError::not_found("Goal", "abc");
        assert_eq!(err.to_string(), "Goal not found: abc");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn rusqlite_errors_are_transport_failures() {
        let err: StoreError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
