//! Error handling for campus events
//!
//! This module defines the error taxonomy shared by every component.
//! Business failures (`NotFound`, `Conflict`, `Validation`) are detected
//! synchronously by the owning component and returned to the caller as is;
//! only storage serialization failures are retried, and only by the
//! services' bounded retry loop.

use std::fmt;
use thiserror::Error;

/// SQLSTATE raised by PostgreSQL when a serializable transaction must be retried
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE raised by PostgreSQL when it breaks a deadlock
const DEADLOCK_DETECTED: &str = "40P01";
/// SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Main error type for campus event operations
#[derive(Error, Debug)]
pub enum CampusError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entity is absent, or exists but belongs to another tenant
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The caller's role lacks the capability for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

/// Entities that can be reported as missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    College,
    User,
    Event,
    Registration,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::College => write!(f, "College"),
            Entity::User => write!(f, "User"),
            Entity::Event => write!(f, "Event"),
            Entity::Registration => write!(f, "Registration"),
        }
    }
}

/// Business-rule violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictReason {
    /// `registered_count` has reached `max_attendees`
    Full,
    DeadlinePassed,
    /// A live registration or a feedback row already exists
    Duplicate,
    EventStarted,
    AlreadyCheckedIn,
    /// The registration is cancelled or marked no-show
    NotCheckable,
    NotAttended,
    /// Transaction retries were exhausted
    Contention,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::Full => "full",
            ConflictReason::DeadlinePassed => "deadline_passed",
            ConflictReason::Duplicate => "duplicate",
            ConflictReason::EventStarted => "event_started",
            ConflictReason::AlreadyCheckedIn => "already_checked_in",
            ConflictReason::NotCheckable => "not_checkable",
            ConflictReason::NotAttended => "not_attended",
            ConflictReason::Contention => "contention",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for campus event operations
pub type Result<T> = std::result::Result<T, CampusError>;

impl CampusError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        CampusError::NotFound { entity, id }
    }

    pub fn conflict(reason: ConflictReason) -> Self {
        CampusError::Conflict(reason)
    }

    /// Map a unique-constraint violation to a `Conflict`, leaving other errors untouched
    pub fn from_unique_violation(error: sqlx::Error, reason: ConflictReason) -> Self {
        if sqlstate(&error).as_deref() == Some(UNIQUE_VIOLATION) {
            CampusError::Conflict(reason)
        } else {
            CampusError::Database(error)
        }
    }

    /// Stable code for the outer HTTP layer
    pub fn code(&self) -> &'static str {
        match self {
            CampusError::Database(_) | CampusError::Migration(_) | CampusError::Io(_) => "internal",
            CampusError::Config(_) => "config",
            CampusError::NotFound { .. } => "not_found",
            CampusError::Conflict(reason) => match reason {
                ConflictReason::Full => "conflict.full",
                ConflictReason::DeadlinePassed => "conflict.deadline_passed",
                ConflictReason::Duplicate => "conflict.duplicate",
                ConflictReason::EventStarted => "conflict.event_started",
                ConflictReason::AlreadyCheckedIn => "conflict.already_checked_in",
                ConflictReason::NotCheckable => "conflict.not_checkable",
                ConflictReason::NotAttended => "conflict.not_attended",
                ConflictReason::Contention => "conflict.contention",
            },
            CampusError::Validation(_) => "validation",
            CampusError::Forbidden(_) => "forbidden",
        }
    }

    /// Check if the storage layer asked for the transaction to be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            CampusError::Database(error) => matches!(
                sqlstate(error).as_deref(),
                Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
            ),
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CampusError::Database(_) => ErrorSeverity::Critical,
            CampusError::Migration(_) => ErrorSeverity::Critical,
            CampusError::Config(_) => ErrorSeverity::Critical,
            CampusError::Io(_) => ErrorSeverity::Error,
            CampusError::Forbidden(_) => ErrorSeverity::Warning,
            CampusError::Conflict(ConflictReason::Contention) => ErrorSeverity::Warning,
            CampusError::NotFound { .. } | CampusError::Conflict(_) | CampusError::Validation(_) => {
                ErrorSeverity::Info
            }
        }
    }
}

fn sqlstate(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::db_error;

    #[test]
    fn test_conflict_codes_are_distinct() {
        let reasons = [
            ConflictReason::Full,
            ConflictReason::DeadlinePassed,
            ConflictReason::Duplicate,
            ConflictReason::EventStarted,
            ConflictReason::AlreadyCheckedIn,
            ConflictReason::NotCheckable,
            ConflictReason::NotAttended,
            ConflictReason::Contention,
        ];
        let codes: std::collections::HashSet<_> = reasons
            .iter()
            .map(|reason| CampusError::conflict(*reason).code())
            .collect();
        assert_eq!(codes.len(), reasons.len());
    }

    #[test]
    fn test_not_found_message() {
        let error = CampusError::not_found(Entity::Event, 42);
        assert_eq!(error.to_string(), "Event not found: 42");
        assert_eq!(error.code(), "not_found");
    }

    #[test]
    fn test_business_errors_are_not_retryable() {
        assert!(!CampusError::conflict(ConflictReason::Full).is_retryable());
        assert!(!CampusError::Validation("rating".into()).is_retryable());
        assert!(!CampusError::Database(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_serialization_failures_are_retryable() {
        assert!(CampusError::Database(db_error("40001")).is_retryable());
        assert!(CampusError::Database(db_error("40P01")).is_retryable());
        assert!(!CampusError::Database(db_error("23503")).is_retryable());
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let error = CampusError::from_unique_violation(db_error("23505"), ConflictReason::Duplicate);
        assert!(matches!(error, CampusError::Conflict(ConflictReason::Duplicate)));
    }

    #[test]
    fn test_unique_violation_passthrough_for_other_errors() {
        let error = CampusError::from_unique_violation(sqlx::Error::RowNotFound, ConflictReason::Duplicate);
        assert!(matches!(error, CampusError::Database(_)));
    }

    #[test]
    fn test_severity() {
        assert_eq!(CampusError::Config("x".into()).severity(), ErrorSeverity::Critical);
        assert_eq!(CampusError::conflict(ConflictReason::Contention).severity(), ErrorSeverity::Warning);
        assert_eq!(CampusError::conflict(ConflictReason::Full).severity(), ErrorSeverity::Info);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }
}
