//! Event catalog service
//!
//! Organizers create, update and delete their tenant's events; everyone in
//! the tenant can browse them. Counters are never written here.

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info, warn};
use crate::database::CampusStore;
use crate::models::*;
use crate::services::retry::{with_retry, RetryPolicy};
use crate::utils::errors::{CampusError, Entity, Result};
use crate::utils::helpers::clamp_limit;
use crate::utils::logging::{log_event_action, log_operation_failure};

const UPCOMING_DEFAULT: i64 = 10;
const UPCOMING_MAX: i64 = 50;
const POPULAR_DEFAULT: i64 = 10;
const POPULAR_MAX: i64 = 50;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CampusStore>,
    retry: RetryPolicy,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CampusStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Create an event in the organizer's tenant
    pub async fn create_event(&self, actor: &Actor, request: CreateEventRequest) -> Result<Event> {
        actor.require(Capability::ManageEvents)?;
        request.validate()?;

        let event = self
            .store
            .create_event(actor.tenant_id, actor.user_id, &request, Utc::now())
            .await
            .inspect_err(|error| log_operation_failure("create_event", actor.user_id, error))?;

        log_event_action(event.id, "created", actor.user_id, Some(&event.title));
        Ok(event)
    }

    /// Apply a partial update; counters cannot be set through this path
    pub async fn update_event(&self, actor: &Actor, event_id: i64, request: UpdateEventRequest) -> Result<Event> {
        actor.require(Capability::ManageEvents)?;

        let event = with_retry(&self.retry, "update_event", || {
            self.store.update_event(event_id, actor.tenant_id, &request, Utc::now())
        })
        .await
        .inspect_err(|error| log_operation_failure("update_event", actor.user_id, error))?;

        log_event_action(event_id, "updated", actor.user_id, None);
        Ok(event)
    }

    /// Delete an event together with its registrations and feedback
    pub async fn delete_event(&self, actor: &Actor, event_id: i64) -> Result<DeletedEvent> {
        actor.require(Capability::ManageEvents)?;

        let deleted = with_retry(&self.retry, "delete_event", || {
            self.store.delete_event(event_id, actor.tenant_id)
        })
        .await
        .inspect_err(|error| log_operation_failure("delete_event", actor.user_id, error))?;

        info!(
            event_id = event_id,
            tenant_id = actor.tenant_id,
            registrations_removed = deleted.registrations_removed,
            feedback_removed = deleted.feedback_removed,
            "Event deleted"
        );
        Ok(deleted)
    }

    pub async fn get_event(&self, actor: &Actor, event_id: i64) -> Result<Event> {
        actor.require(Capability::BrowseEvents)?;
        self.store
            .find_event(event_id, actor.tenant_id)
            .await?
            .ok_or_else(|| CampusError::not_found(Entity::Event, event_id))
    }

    /// Filtered listing ordered by date ascending
    pub async fn list_events(&self, actor: &Actor, filter: &EventFilter) -> Result<Vec<Event>> {
        actor.require(Capability::BrowseEvents)?;
        debug!(tenant_id = actor.tenant_id, limit = filter.limit(), "Listing events");
        self.store.list_events(actor.tenant_id, filter).await
    }

    /// Active events that have not started yet
    pub async fn upcoming_events(&self, actor: &Actor, limit: Option<i64>) -> Result<Vec<Event>> {
        let filter = EventFilter {
            status: Some(EventStatus::Active),
            from: Some(Utc::now()),
            limit: Some(clamp_limit(limit, UPCOMING_DEFAULT, UPCOMING_MAX)),
            ..EventFilter::default()
        };
        self.list_events(actor, &filter).await
    }

    /// Events a student can still register for
    pub async fn available_events(&self, actor: &Actor, category: Option<EventCategory>) -> Result<Vec<Event>> {
        let now = Utc::now();
        let filter = EventFilter {
            category,
            status: Some(EventStatus::Active),
            from: Some(now),
            registration_open_only: true,
            ..EventFilter::default()
        };
        let mut events = self.list_events(actor, &filter).await?;
        events.retain(|event| !event.deadline_passed(now));
        Ok(events)
    }

    /// Active events with the most registrations
    pub async fn popular_events(&self, actor: &Actor, limit: Option<i64>) -> Result<Vec<Event>> {
        actor.require(Capability::BrowseEvents)?;
        let limit = clamp_limit(limit, POPULAR_DEFAULT, POPULAR_MAX);
        self.store.popular_events(actor.tenant_id, limit).await
    }

    /// Categories the tenant's events use
    pub async fn categories(&self, actor: &Actor) -> Result<Vec<EventCategory>> {
        actor.require(Capability::BrowseEvents)?;
        self.store.event_categories(actor.tenant_id).await
    }

    /// Events whose stored counters disagree with their registration rows
    pub async fn audit_counters(&self, tenant_id: Option<i64>) -> Result<Vec<CounterDrift>> {
        let snapshot = self.store.counter_snapshot(tenant_id).await?;
        let checked = snapshot.len();
        let drifted: Vec<CounterDrift> = snapshot.into_iter().filter(|row| !row.is_consistent()).collect();

        if drifted.is_empty() {
            info!(events_checked = checked, "Counter audit passed");
        } else {
            for row in &drifted {
                warn!(
                    event_id = row.event_id,
                    stored_registered = row.stored_registered,
                    actual_registered = row.actual_registered,
                    stored_attended = row.stored_attended,
                    actual_attended = row.actual_attended,
                    "Counter drift detected"
                );
            }
        }
        Ok(drifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn request(title: &str, days_ahead: i64) -> CreateEventRequest {
        CreateEventRequest {
            title: title.to_string(),
            description: "Hands-on session".to_string(),
            date: Utc::now() + Duration::days(days_ahead),
            location: "Hall B".to_string(),
            category: EventCategory::Workshop,
            max_attendees: 20,
            status: None,
            requirements: None,
            tags: None,
            is_registration_open: None,
            registration_deadline: None,
        }
    }

    fn catalog() -> CatalogService {
        CatalogService::new(Arc::new(MemoryStore::new()), RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_students_cannot_manage_events() {
        let catalog = catalog();
        let student = Actor::new(10, 1, Role::Student);

        let result = catalog.create_event(&student, request("Rust 101", 3)).await;
        assert_matches!(result, Err(CampusError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_upcoming_skips_past_and_orders_by_date() {
        let catalog = catalog();
        let organizer = Actor::new(1, 1, Role::Faculty);

        catalog.create_event(&organizer, request("Later", 9)).await.unwrap();
        catalog.create_event(&organizer, request("Sooner", 2)).await.unwrap();
        catalog.create_event(&organizer, request("Past", -2)).await.unwrap();

        let titles: Vec<String> = catalog
            .upcoming_events(&organizer, None)
            .await
            .unwrap()
            .into_iter()
            .map(|event| event.title)
            .collect();
        assert_eq!(titles, vec!["Sooner", "Later"]);
    }

    #[tokio::test]
    async fn test_available_hides_closed_registration() {
        let catalog = catalog();
        let organizer = Actor::new(1, 1, Role::Admin);
        let student = Actor::new(2, 1, Role::Student);

        let mut closed = request("Closed", 4);
        closed.is_registration_open = Some(false);
        catalog.create_event(&organizer, closed).await.unwrap();
        catalog.create_event(&organizer, request("Open", 4)).await.unwrap();

        let available = catalog.available_events(&student, None).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].title, "Open");
    }

    #[tokio::test]
    async fn test_get_event_hides_other_tenants() {
        let catalog = catalog();
        let organizer = Actor::new(1, 1, Role::Faculty);
        let outsider = Actor::new(5, 2, Role::Faculty);

        let event = catalog.create_event(&organizer, request("Career fair", 5)).await.unwrap();
        assert_matches!(
            catalog.get_event(&outsider, event.id).await,
            Err(CampusError::NotFound { entity: Entity::Event, .. })
        );
    }

    #[tokio::test]
    async fn test_popular_limit_is_clamped() {
        let catalog = catalog();
        let organizer = Actor::new(1, 1, Role::Faculty);

        for day in 1..=12 {
            catalog.create_event(&organizer, request("Session", day)).await.unwrap();
        }

        assert_eq!(catalog.popular_events(&organizer, None).await.unwrap().len(), 10);
        assert_eq!(catalog.popular_events(&organizer, Some(0)).await.unwrap().len(), 1);
        assert_eq!(catalog.popular_events(&organizer, Some(500)).await.unwrap().len(), 12);
    }
}
