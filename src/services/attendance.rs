//! Attendance processor
//!
//! Check-in moves a registration to `attended` and bumps the event's
//! `attended_count` and the student's lifetime `events_attended` as one
//! unit. A repeat check-in is a conflict, not a no-op.

use std::sync::Arc;
use chrono::Utc;
use tracing::info;
use crate::database::CampusStore;
use crate::models::{Actor, Capability, Registration};
use crate::services::retry::{with_retry, RetryPolicy};
use crate::utils::errors::Result;
use crate::utils::logging::log_operation_failure;

#[derive(Clone)]
pub struct AttendanceProcessor {
    store: Arc<dyn CampusStore>,
    retry: RetryPolicy,
}

impl AttendanceProcessor {
    pub fn new(store: Arc<dyn CampusStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn check_in(&self, actor: &Actor, registration_id: i64) -> Result<Registration> {
        actor.require(Capability::CheckIn)?;

        let registration = with_retry(&self.retry, "check_in", || {
            self.store.check_in(registration_id, actor.tenant_id, Utc::now())
        })
        .await
        .inspect_err(|error| log_operation_failure("check_in", actor.user_id, error))?;

        info!(
            registration_id = registration_id,
            event_id = registration.event_id,
            student_id = registration.student_id,
            checked_in_by = actor.user_id,
            "Student checked in"
        );
        Ok(registration)
    }
}
