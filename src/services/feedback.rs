//! Feedback gate
//!
//! Only students checked in to an event may rate it, once each.

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info};
use crate::database::CampusStore;
use crate::models::{Actor, Capability, Feedback, SubmitFeedbackRequest};
use crate::utils::errors::Result;
use crate::utils::logging::log_operation_failure;

#[derive(Clone)]
pub struct FeedbackGate {
    store: Arc<dyn CampusStore>,
}

impl FeedbackGate {
    pub fn new(store: Arc<dyn CampusStore>) -> Self {
        Self { store }
    }

    pub async fn submit(&self, student: &Actor, event_id: i64, request: SubmitFeedbackRequest) -> Result<Feedback> {
        student.require(Capability::SubmitFeedback)?;
        request.validate()?;

        let feedback = self
            .store
            .submit_feedback(student, event_id, &request, Utc::now())
            .await
            .inspect_err(|error| log_operation_failure("submit_feedback", student.user_id, error))?;

        info!(
            event_id = event_id,
            student_id = student.user_id,
            rating = feedback.rating,
            "Feedback submitted"
        );
        Ok(feedback)
    }

    /// Organizer view of an event's feedback, newest first
    pub async fn event_feedback(&self, actor: &Actor, event_id: i64) -> Result<Vec<Feedback>> {
        actor.require(Capability::ViewRegistrations)?;
        self.store.event_feedback(event_id, actor.tenant_id).await
    }

    /// Feedback across the actor's tenant, optionally for one event
    pub async fn all_feedback(&self, actor: &Actor, event_id: Option<i64>) -> Result<Vec<Feedback>> {
        actor.require(Capability::ViewRegistrations)?;
        debug!(tenant_id = actor.tenant_id, event_id = ?event_id, "Listing tenant feedback");
        self.store.tenant_feedback(actor.tenant_id, event_id).await
    }
}
