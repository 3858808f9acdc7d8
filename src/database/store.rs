//! Storage contract for the registration lifecycle
//!
//! Every counter-mutating method is one atomic unit: it reads the gating
//! fields, validates, and writes the new state and counters with no other
//! writer interleaving on the same event. Implementations differ only in
//! how they achieve that (row locks in PostgreSQL, a per-event mutex in
//! memory).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crate::models::*;
use crate::utils::errors::Result;

#[async_trait]
pub trait CampusStore: Send + Sync {
    async fn health_check(&self) -> Result<()>;

    // Tenant directory (external collaborator, kept to its interface)
    async fn create_college(&self, name: &str) -> Result<College>;
    async fn create_user(&self, request: &CreateUserRequest) -> Result<User>;
    async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

    // Event catalog
    async fn create_event(
        &self,
        tenant_id: i64,
        organizer_id: i64,
        request: &CreateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event>;
    /// Fails with `NotFound` when the event is not in `tenant_id`
    async fn update_event(
        &self,
        event_id: i64,
        tenant_id: i64,
        request: &UpdateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event>;
    /// Removes feedback, registrations and the event in one unit
    async fn delete_event(&self, event_id: i64, tenant_id: i64) -> Result<DeletedEvent>;
    async fn find_event(&self, event_id: i64, tenant_id: i64) -> Result<Option<Event>>;
    /// Ordered by event date ascending
    async fn list_events(&self, tenant_id: i64, filter: &EventFilter) -> Result<Vec<Event>>;
    /// Active events, most registrations first, then soonest
    async fn popular_events(&self, tenant_id: i64, limit: i64) -> Result<Vec<Event>>;
    /// Distinct categories in use, in declaration order
    async fn event_categories(&self, tenant_id: i64) -> Result<Vec<EventCategory>>;

    // Registration ledger
    async fn register(&self, student: &Actor, event_id: i64, now: DateTime<Utc>) -> Result<Registration>;
    async fn cancel(&self, student: &Actor, event_id: i64, now: DateTime<Utc>) -> Result<Registration>;
    /// Newest first
    async fn student_registrations(
        &self,
        student_id: i64,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>>;
    /// Fails with `NotFound` when the event is not in `tenant_id`
    async fn event_registrations(&self, event_id: i64, tenant_id: i64) -> Result<Vec<Registration>>;
    /// Events the student attended within their tenant, newest first
    async fn attended_events(&self, student: &Actor) -> Result<Vec<Event>>;

    // Attendance processor
    async fn check_in(&self, registration_id: i64, tenant_id: i64, now: DateTime<Utc>) -> Result<Registration>;

    // Feedback gate
    async fn submit_feedback(
        &self,
        student: &Actor,
        event_id: i64,
        request: &SubmitFeedbackRequest,
        now: DateTime<Utc>,
    ) -> Result<Feedback>;
    /// Fails with `NotFound` when the event is not in `tenant_id`; newest first
    async fn event_feedback(&self, event_id: i64, tenant_id: i64) -> Result<Vec<Feedback>>;
    /// Feedback across the tenant's events, narrowed to one event when given; newest first
    async fn tenant_feedback(&self, tenant_id: i64, event_id: Option<i64>) -> Result<Vec<Feedback>>;

    // Maintenance
    /// Counters for every event (optionally one tenant's), consistent or not
    async fn counter_snapshot(&self, tenant_id: Option<i64>) -> Result<Vec<CounterDrift>>;
}
