//! Registration ledger service
//!
//! Drives the `registered -> {cancelled, attended}` lifecycle from the
//! student side. Every counter-mutating call goes through the bounded
//! transaction retry.

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info};
use crate::database::CampusStore;
use crate::models::*;
use crate::services::retry::{with_retry, RetryPolicy};
use crate::utils::errors::Result;
use crate::utils::logging::log_operation_failure;

#[derive(Clone)]
pub struct RegistrationLedger {
    store: Arc<dyn CampusStore>,
    retry: RetryPolicy,
}

impl RegistrationLedger {
    pub fn new(store: Arc<dyn CampusStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Register the student for an event, taking one seat
    pub async fn register(&self, student: &Actor, event_id: i64) -> Result<Registration> {
        student.require(Capability::Register)?;

        let registration = with_retry(&self.retry, "register", || {
            self.store.register(student, event_id, Utc::now())
        })
        .await
        .inspect_err(|error| log_operation_failure("register", student.user_id, error))?;

        info!(
            registration_id = registration.id,
            event_id = event_id,
            student_id = student.user_id,
            "Student registered"
        );
        Ok(registration)
    }

    /// Cancel the student's registration before the event starts, freeing the seat
    pub async fn cancel(&self, student: &Actor, event_id: i64) -> Result<Registration> {
        student.require(Capability::Register)?;

        let registration = with_retry(&self.retry, "cancel", || {
            self.store.cancel(student, event_id, Utc::now())
        })
        .await
        .inspect_err(|error| log_operation_failure("cancel", student.user_id, error))?;

        info!(
            registration_id = registration.id,
            event_id = event_id,
            student_id = student.user_id,
            "Registration cancelled"
        );
        Ok(registration)
    }

    /// The caller's own registrations, newest first
    pub async fn my_registrations(
        &self,
        student: &Actor,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>> {
        student.require(Capability::Register)?;
        debug!(student_id = student.user_id, status = ?status, "Listing registrations");
        self.store.student_registrations(student.user_id, status).await
    }

    /// Organizer view of every registration row for one event
    pub async fn event_registrations(&self, actor: &Actor, event_id: i64) -> Result<Vec<Registration>> {
        actor.require(Capability::ViewRegistrations)?;
        self.store.event_registrations(event_id, actor.tenant_id).await
    }

    /// Events the student has been checked in to, newest first
    pub async fn attended_events(&self, student: &Actor) -> Result<Vec<Event>> {
        student.require(Capability::Register)?;
        self.store.attended_events(student).await
    }
}
