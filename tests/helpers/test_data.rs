//! Test data helpers for creating request objects

use std::sync::atomic::{AtomicU64, Ordering};
use chrono::{Duration, Utc};
use fake::Fake;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use campus_events::models::{CreateEventRequest, CreateUserRequest, EventCategory, Role};

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// A user with a random name and a unique address
pub fn user_request(college_id: i64, role: Role) -> CreateUserRequest {
    let name: String = Name().fake();
    CreateUserRequest {
        college_id,
        name,
        email: format!("user{}@college{}.edu", next_sequence(), college_id),
        role,
    }
}

/// An active, open event one week out
pub fn upcoming_event(max_attendees: i32) -> CreateEventRequest {
    event_starting_in(Duration::days(7), max_attendees)
}

pub fn event_starting_in(offset: Duration, max_attendees: i32) -> CreateEventRequest {
    let words: Vec<String> = Words(2..4).fake();
    CreateEventRequest {
        title: words.join(" "),
        description: "Integration test event".to_string(),
        date: Utc::now() + offset,
        location: "Main Auditorium".to_string(),
        category: EventCategory::Technology,
        max_attendees,
        requirements: None,
        tags: Some("test".to_string()),
        status: None,
        is_registration_open: None,
        registration_deadline: None,
    }
}

/// An upcoming event whose registration deadline already elapsed
pub fn event_past_deadline(max_attendees: i32) -> CreateEventRequest {
    CreateEventRequest {
        registration_deadline: Some(Utc::now() - Duration::hours(1)),
        ..upcoming_event(max_attendees)
    }
}
