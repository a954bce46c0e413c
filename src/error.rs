//! Error types for the dashboard core.
//!
//! Every failure path either completes the reclassify/aggregate step or leaves
//! the indicator collection untouched.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {
    /// Unknown indicator id on a manual edit
    #[error("Indicator not found: {0}")]
    NotFound(String),

    /// Non-numeric or otherwise unusable input; state is untouched
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Price fetch failed (network, status, parse). Never surfaced as blocking.
    #[error("Price refresh failed: {0}")]
    RefreshFailure(String),

    /// Durable storage read/write failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Chat error: {0}")]
    Chat(String),
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::RefreshFailure(err.to_string())
    }
}

impl From<sqlx::Error> for DashboardError {
    fn from(err: sqlx::Error) -> Self {
        DashboardError::PersistenceFailure(err.to_string())
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::PersistenceFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DashboardError::NotFound("mvrv2".to_string());
        assert_eq!(err.to_string(), "Indicator not found: mvrv2");
    }

    #[test]
    fn test_json_error_is_persistence_failure() {
        let json_err = serde_json::from_str::<Vec<i32>>("{broken").unwrap_err();
        let err: DashboardError = json_err.into();
        assert!(matches!(err, DashboardError::PersistenceFailure(_)));
    }
}
