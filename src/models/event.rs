//! Event model
//!
//! An event's `registered_count` and `attended_count` are derived counters.
//! Nothing in this module writes them; the registration ledger and the
//! attendance processor own every mutation.

use serde::{Deserialize, Deserializer, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusError, ConflictReason, Result};
use crate::utils::helpers::{clamp_limit, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Active,
    Cancelled,
    Completed,
}

/// Declaration order matches the `event_category` enum in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Technology,
    Career,
    Cultural,
    Sports,
    Academic,
    Workshop,
    Seminar,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub college_id: i64,
    pub organizer_id: i64,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: EventCategory,
    pub max_attendees: i32,
    pub registered_count: i32,
    pub attended_count: i32,
    pub status: EventStatus,
    pub requirements: Option<String>,
    pub tags: Option<String>,
    pub is_registration_open: bool,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub category: EventCategory,
    pub max_attendees: i32,
    pub requirements: Option<String>,
    pub tags: Option<String>,
    pub status: Option<EventStatus>,
    pub is_registration_open: Option<bool>,
    pub registration_deadline: Option<DateTime<Utc>>,
}

/// Partial update of an event's mutable fields. Counters are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub category: Option<EventCategory>,
    pub max_attendees: Option<i32>,
    /// `Some(None)` clears the field; absent leaves it unchanged
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Option<String>>,
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub tags: Option<Option<String>>,
    pub status: Option<EventStatus>,
    pub is_registration_open: Option<bool>,
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub registration_deadline: Option<Option<DateTime<Utc>>>,
}

/// Distinguish an explicit `null` from an absent field
fn present_or_null<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Tenant-scoped catalogue query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    pub category: Option<EventCategory>,
    pub status: Option<EventStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub registration_open_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Rows removed by an event deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEvent {
    pub event_id: i64,
    pub registrations_removed: u64,
    pub feedback_removed: u64,
}

/// Stored counters that disagree with the registration rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CounterDrift {
    pub event_id: i64,
    pub stored_registered: i64,
    pub actual_registered: i64,
    pub stored_attended: i64,
    pub actual_attended: i64,
}

impl CounterDrift {
    pub fn is_consistent(&self) -> bool {
        self.stored_registered == self.actual_registered && self.stored_attended == self.actual_attended
    }
}

impl Event {
    /// Only active events with registration open take new registrations
    pub fn accepts_registrations(&self) -> bool {
        self.status == EventStatus::Active && self.is_registration_open
    }

    pub fn is_full(&self) -> bool {
        self.registered_count >= self.max_attendees
    }

    pub fn remaining_capacity(&self) -> i32 {
        (self.max_attendees - self.registered_count).max(0)
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.registration_deadline.map_or(false, |deadline| deadline < now)
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.date <= now
    }

    /// Capacity and deadline gate, checked in that order.
    /// Visibility (`accepts_registrations`) is reported separately as `NotFound`.
    pub fn ensure_can_register(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_full() {
            return Err(CampusError::conflict(ConflictReason::Full));
        }
        if self.deadline_passed(now) {
            return Err(CampusError::conflict(ConflictReason::DeadlinePassed));
        }
        Ok(())
    }

    /// Merge a partial update into a copy of this event and validate the result
    pub fn apply_update(&self, request: &UpdateEventRequest, now: DateTime<Utc>) -> Result<Event> {
        let mut updated = self.clone();

        if let Some(title) = &request.title {
            updated.title = title.clone();
        }
        if let Some(description) = &request.description {
            updated.description = description.clone();
        }
        if let Some(date) = request.date {
            updated.date = date;
        }
        if let Some(location) = &request.location {
            updated.location = location.clone();
        }
        if let Some(category) = request.category {
            updated.category = category;
        }
        if let Some(max_attendees) = request.max_attendees {
            updated.max_attendees = max_attendees;
        }
        if let Some(requirements) = &request.requirements {
            updated.requirements = requirements.clone();
        }
        if let Some(tags) = &request.tags {
            updated.tags = tags.clone();
        }
        if let Some(status) = request.status {
            updated.status = status;
        }
        if let Some(open) = request.is_registration_open {
            updated.is_registration_open = open;
        }
        if let Some(deadline) = request.registration_deadline {
            updated.registration_deadline = deadline;
        }
        updated.updated_at = now;

        validate_fields(&updated.title, updated.max_attendees, updated.date, updated.registration_deadline)?;
        if updated.max_attendees < updated.registered_count {
            return Err(CampusError::Validation(format!(
                "max_attendees {} is below the {} live registrations",
                updated.max_attendees, updated.registered_count
            )));
        }

        Ok(updated)
    }
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.title, self.max_attendees, self.date, self.registration_deadline)
    }

    /// Build the initial record: counters at zero, active and open unless stated otherwise
    pub fn into_event(self, id: i64, college_id: i64, organizer_id: i64, now: DateTime<Utc>) -> Event {
        Event {
            id,
            college_id,
            organizer_id,
            title: self.title,
            description: self.description,
            date: self.date,
            location: self.location,
            category: self.category,
            max_attendees: self.max_attendees,
            registered_count: 0,
            attended_count: 0,
            status: self.status.unwrap_or(EventStatus::Active),
            requirements: self.requirements,
            tags: self.tags,
            is_registration_open: self.is_registration_open.unwrap_or(true),
            registration_deadline: self.registration_deadline,
            created_at: now,
            updated_at: now,
        }
    }
}

impl EventFilter {
    pub const MAX_LIMIT: i64 = 100;

    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit, DEFAULT_PAGE_SIZE, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// In-process evaluation of the same predicate the SQL query applies
    pub fn matches(&self, event: &Event) -> bool {
        self.category.map_or(true, |category| event.category == category)
            && self.status.map_or(true, |status| event.status == status)
            && crate::utils::helpers::within_window(event.date, self.from, self.to)
            && (!self.registration_open_only || event.is_registration_open)
    }
}

fn validate_fields(
    title: &str,
    max_attendees: i32,
    date: DateTime<Utc>,
    registration_deadline: Option<DateTime<Utc>>,
) -> Result<()> {
    if title.trim().is_empty() {
        return Err(CampusError::Validation("title must not be empty".to_string()));
    }
    if max_attendees < 1 {
        return Err(CampusError::Validation("max_attendees must be at least 1".to_string()));
    }
    if let Some(deadline) = registration_deadline {
        if deadline > date {
            return Err(CampusError::Validation(
                "registration_deadline must not be after the event date".to_string(),
            ));
        }
    }
    Ok(())
}
