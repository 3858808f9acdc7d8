//! Data models module
//!
//! This module contains all data structures used throughout the crate

pub mod user;
pub mod event;
pub mod registration;
pub mod feedback;

// Re-export commonly used models
pub use user::{Actor, Capability, College, CreateUserRequest, Role, User};
pub use event::{CounterDrift, CreateEventRequest, DeletedEvent, Event, EventCategory, EventFilter, EventStatus, UpdateEventRequest};
pub use registration::{Registration, RegistrationStatus};
pub use feedback::{Feedback, SubmitFeedbackRequest};
