//! Registration model and its state machine
//!
//! `registered` is the only non-terminal state. From there a registration
//! may be cancelled by the student or checked in by an organizer.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusError, ConflictReason, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    Cancelled,
    Attended,
    NoShow,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 4] = [
        RegistrationStatus::Registered,
        RegistrationStatus::Cancelled,
        RegistrationStatus::Attended,
        RegistrationStatus::NoShow,
    ];

    /// Live registrations count toward capacity
    pub fn is_live(&self) -> bool {
        matches!(self, RegistrationStatus::Registered | RegistrationStatus::Attended)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RegistrationStatus::Registered)
    }

    pub fn can_transition_to(&self, next: RegistrationStatus) -> bool {
        matches!(
            (self, next),
            (RegistrationStatus::Registered, RegistrationStatus::Cancelled)
                | (RegistrationStatus::Registered, RegistrationStatus::Attended)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Attended => "attended",
            RegistrationStatus::NoShow => "no_show",
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: i64,
    pub student_id: i64,
    pub event_id: i64,
    pub status: RegistrationStatus,
    pub check_in_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(id: i64, student_id: i64, event_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            student_id,
            event_id,
            status: RegistrationStatus::Registered,
            check_in_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A repeat check-in is a conflict, not a no-op
    pub fn ensure_checkable(&self) -> Result<()> {
        match self.status {
            RegistrationStatus::Registered => Ok(()),
            RegistrationStatus::Attended => Err(CampusError::conflict(ConflictReason::AlreadyCheckedIn)),
            RegistrationStatus::Cancelled | RegistrationStatus::NoShow => {
                Err(CampusError::conflict(ConflictReason::NotCheckable))
            }
        }
    }

    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        debug_assert!(self.status.can_transition_to(RegistrationStatus::Cancelled));
        self.status = RegistrationStatus::Cancelled;
        self.updated_at = now;
    }

    pub fn mark_attended(&mut self, now: DateTime<Utc>) {
        debug_assert!(self.status.can_transition_to(RegistrationStatus::Attended));
        self.status = RegistrationStatus::Attended;
        self.check_in_time = Some(now);
        self.updated_at = now;
    }
}
