//! Test context for unified test setup
//!
//! A context owns one store, the service factory over it, and a default
//! college with an organizer, which is enough for most scenarios.

use std::sync::Arc;
use campus_events::config::Settings;
use campus_events::models::*;
use campus_events::{CampusStore, MemoryStore, ServiceFactory};
use super::test_data::{upcoming_event, user_request};

pub struct TestContext {
    pub store: Arc<dyn CampusStore>,
    pub services: ServiceFactory,
    pub college: College,
    pub organizer: Actor,
}

/// Settings with fast retries so contention tests stay quick
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.registration.max_transaction_retries = 5;
    settings.registration.retry_base_delay_ms = 1;
    settings
}

impl TestContext {
    /// Context over a fresh in-process store
    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }

    pub async fn with_store(store: Arc<dyn CampusStore>) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let services = ServiceFactory::new(store.clone(), &test_settings());
        let college = store.create_college("North Campus").await.expect("create college");
        let organizer = store
            .create_user(&user_request(college.id, Role::Faculty))
            .await
            .expect("create organizer")
            .actor();

        Self { store, services, college, organizer }
    }

    pub async fn add_college(&self, name: &str) -> College {
        self.store.create_college(name).await.expect("create college")
    }

    pub async fn user_in(&self, college_id: i64, role: Role) -> Actor {
        self.store
            .create_user(&user_request(college_id, role))
            .await
            .expect("create user")
            .actor()
    }

    pub async fn student(&self) -> Actor {
        self.user_in(self.college.id, Role::Student).await
    }

    pub async fn students(&self, count: usize) -> Vec<Actor> {
        let mut students = Vec::with_capacity(count);
        for _ in 0..count {
            students.push(self.student().await);
        }
        students
    }

    pub async fn admin(&self) -> Actor {
        self.user_in(self.college.id, Role::Admin).await
    }

    /// Active, open event one week out in the default college
    pub async fn event(&self, max_attendees: i32) -> Event {
        self.event_with(upcoming_event(max_attendees)).await
    }

    pub async fn event_with(&self, request: CreateEventRequest) -> Event {
        self.services
            .catalog
            .create_event(&self.organizer, request)
            .await
            .expect("create event")
    }

    pub async fn reload_event(&self, event_id: i64) -> Event {
        self.store
            .find_event(event_id, self.college.id)
            .await
            .expect("find event")
            .expect("event exists")
    }

    pub async fn reload_user(&self, user_id: i64) -> User {
        self.store
            .find_user(user_id)
            .await
            .expect("find user")
            .expect("user exists")
    }

    /// Register and check in, returning the attended registration
    pub async fn attend(&self, student: &Actor, event_id: i64) -> Registration {
        let registration = self
            .services
            .ledger
            .register(student, event_id)
            .await
            .expect("register");
        self.services
            .attendance
            .check_in(&self.organizer, registration.id)
            .await
            .expect("check in")
    }

    /// Assert that the stored counters match the registration rows everywhere
    pub async fn assert_counters_consistent(&self) {
        let drift = self
            .services
            .catalog
            .audit_counters(None)
            .await
            .expect("audit counters");
        assert!(drift.is_empty(), "counter drift: {:?}", drift);
    }
}
