//! PostgreSQL implementation of the campus store
//!
//! Counter-mutating operations run in a transaction that starts by locking
//! the event row with `SELECT ... FOR UPDATE`, then the registration row.
//! The lock order is the same everywhere so concurrent registration,
//! cancellation and check-in on one event queue behind each other instead
//! of deadlocking. Feedback only takes a shared lock on the event row,
//! which keeps a concurrent delete out until it commits. Dropping a
//! transaction without commit rolls it back, so every early `?` return
//! leaves the rows untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use crate::database::{DatabasePool, EventRepository, FeedbackRepository, RegistrationRepository, UserRepository};
use crate::database::store::CampusStore;
use crate::models::*;
use crate::utils::errors::{CampusError, ConflictReason, Entity, Result};
use crate::utils::logging::log_counter_change;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub users: UserRepository,
    pub events: EventRepository,
    pub registrations: RegistrationRepository,
    pub feedback: FeedbackRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            feedback: FeedbackRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    async fn require_event(&self, event_id: i64, tenant_id: i64) -> Result<Event> {
        self.events
            .find_by_id(event_id, tenant_id)
            .await?
            .ok_or_else(|| CampusError::not_found(Entity::Event, event_id))
    }
}

#[async_trait]
impl CampusStore for DatabaseService {
    async fn health_check(&self) -> Result<()> {
        crate::database::health_check(&self.pool).await
    }

    async fn create_college(&self, name: &str) -> Result<College> {
        self.users.create_college(name).await
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<User> {
        self.users.create(request).await
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        self.users.find_by_id(user_id).await
    }

    async fn create_event(
        &self,
        tenant_id: i64,
        organizer_id: i64,
        request: &CreateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        self.events.create(tenant_id, organizer_id, request, now).await
    }

    async fn update_event(
        &self,
        event_id: i64,
        tenant_id: i64,
        request: &UpdateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        let mut tx = self.pool.begin().await?;

        let event = EventRepository::lock(&mut *tx, event_id, tenant_id)
            .await?
            .ok_or_else(|| CampusError::not_found(Entity::Event, event_id))?;
        let merged = event.apply_update(request, now)?;
        let saved = EventRepository::save_fields(&mut *tx, &merged).await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn delete_event(&self, event_id: i64, tenant_id: i64) -> Result<DeletedEvent> {
        let mut tx = self.pool.begin().await?;

        EventRepository::lock(&mut *tx, event_id, tenant_id)
            .await?
            .ok_or_else(|| CampusError::not_found(Entity::Event, event_id))?;
        let feedback_removed = FeedbackRepository::delete_for_event(&mut *tx, event_id).await?;
        let registrations_removed = RegistrationRepository::delete_for_event(&mut *tx, event_id).await?;
        EventRepository::delete(&mut *tx, event_id).await?;

        tx.commit().await?;
        Ok(DeletedEvent { event_id, registrations_removed, feedback_removed })
    }

    async fn find_event(&self, event_id: i64, tenant_id: i64) -> Result<Option<Event>> {
        self.events.find_by_id(event_id, tenant_id).await
    }

    async fn list_events(&self, tenant_id: i64, filter: &EventFilter) -> Result<Vec<Event>> {
        self.events.list(tenant_id, filter).await
    }

    async fn popular_events(&self, tenant_id: i64, limit: i64) -> Result<Vec<Event>> {
        self.events.popular(tenant_id, limit).await
    }

    async fn event_categories(&self, tenant_id: i64) -> Result<Vec<EventCategory>> {
        self.events.categories(tenant_id).await
    }

    async fn register(&self, student: &Actor, event_id: i64, now: DateTime<Utc>) -> Result<Registration> {
        let mut tx = self.pool.begin().await?;

        let event = EventRepository::lock(&mut *tx, event_id, student.tenant_id)
            .await?
            .filter(Event::accepts_registrations)
            .ok_or_else(|| CampusError::not_found(Entity::Event, event_id))?;
        event.ensure_can_register(now)?;

        if RegistrationRepository::has_live(&mut *tx, student.user_id, event_id).await? {
            return Err(CampusError::conflict(ConflictReason::Duplicate));
        }

        let registration = RegistrationRepository::insert(&mut *tx, student.user_id, event_id, now).await?;
        let registered = EventRepository::adjust_registered(&mut *tx, event_id, 1, now).await?;

        tx.commit().await?;
        log_counter_change(event_id, "registered_count", 1, registered);
        Ok(registration)
    }

    async fn cancel(&self, student: &Actor, event_id: i64, now: DateTime<Utc>) -> Result<Registration> {
        let mut tx = self.pool.begin().await?;

        let event = EventRepository::lock(&mut *tx, event_id, student.tenant_id)
            .await?
            .ok_or_else(|| CampusError::not_found(Entity::Registration, event_id))?;
        let mut registration = RegistrationRepository::lock_registered(&mut *tx, student.user_id, event_id)
            .await?
            .ok_or_else(|| CampusError::not_found(Entity::Registration, event_id))?;

        if event.has_started(now) {
            return Err(CampusError::conflict(ConflictReason::EventStarted));
        }

        registration.mark_cancelled(now);
        let saved = RegistrationRepository::save_status(&mut *tx, &registration).await?;
        let registered = EventRepository::adjust_registered(&mut *tx, event_id, -1, now).await?;

        tx.commit().await?;
        log_counter_change(event_id, "registered_count", -1, registered);
        Ok(saved)
    }

    async fn student_registrations(
        &self,
        student_id: i64,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>> {
        self.registrations.for_student(student_id, status).await
    }

    async fn event_registrations(&self, event_id: i64, tenant_id: i64) -> Result<Vec<Registration>> {
        self.require_event(event_id, tenant_id).await?;
        self.registrations.for_event(event_id).await
    }

    async fn attended_events(&self, student: &Actor) -> Result<Vec<Event>> {
        self.events.attended_by(student.user_id, student.tenant_id).await
    }

    async fn check_in(&self, registration_id: i64, tenant_id: i64, now: DateTime<Utc>) -> Result<Registration> {
        let mut tx = self.pool.begin().await?;

        let not_found = || CampusError::not_found(Entity::Registration, registration_id);
        let event_id = RegistrationRepository::event_id_of(&mut *tx, registration_id, tenant_id)
            .await?
            .ok_or_else(not_found)?;
        EventRepository::lock(&mut *tx, event_id, tenant_id)
            .await?
            .ok_or_else(not_found)?;
        let mut registration = RegistrationRepository::lock(&mut *tx, registration_id)
            .await?
            .ok_or_else(not_found)?;

        registration.ensure_checkable()?;
        registration.mark_attended(now);

        let saved = RegistrationRepository::save_status(&mut *tx, &registration).await?;
        let attended = EventRepository::increment_attended(&mut *tx, event_id, now).await?;
        UserRepository::increment_events_attended(&mut *tx, registration.student_id).await?;

        tx.commit().await?;
        log_counter_change(event_id, "attended_count", 1, attended);
        Ok(saved)
    }

    async fn submit_feedback(
        &self,
        student: &Actor,
        event_id: i64,
        request: &SubmitFeedbackRequest,
        now: DateTime<Utc>,
    ) -> Result<Feedback> {
        let mut tx = self.pool.begin().await?;

        let not_attended = || CampusError::conflict(ConflictReason::NotAttended);
        EventRepository::lock_shared(&mut *tx, event_id, student.tenant_id)
            .await?
            .ok_or_else(not_attended)?;
        if !RegistrationRepository::has_attended(&mut *tx, student.user_id, event_id).await? {
            return Err(not_attended());
        }
        if FeedbackRepository::exists(&mut *tx, student.user_id, event_id).await? {
            return Err(CampusError::conflict(ConflictReason::Duplicate));
        }
        let feedback = FeedbackRepository::insert(&mut *tx, student.user_id, event_id, request, now).await?;

        tx.commit().await?;
        debug!(event_id = event_id, student_id = student.user_id, "Feedback stored");
        Ok(feedback)
    }

    async fn event_feedback(&self, event_id: i64, tenant_id: i64) -> Result<Vec<Feedback>> {
        self.require_event(event_id, tenant_id).await?;
        self.feedback.for_event(event_id).await
    }

    async fn tenant_feedback(&self, tenant_id: i64, event_id: Option<i64>) -> Result<Vec<Feedback>> {
        self.feedback.for_tenant(tenant_id, event_id).await
    }

    async fn counter_snapshot(&self, tenant_id: Option<i64>) -> Result<Vec<CounterDrift>> {
        self.events.counter_snapshot(tenant_id).await
    }
}
