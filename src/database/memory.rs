//! In-process campus store
//!
//! Each event owns a slot holding its registrations and feedback behind a
//! `tokio::sync::Mutex`, so every operation on one event is a single-writer
//! critical section. Operations on different events never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use crate::database::store::CampusStore;
use crate::models::*;
use crate::utils::errors::{CampusError, ConflictReason, Entity, Result};
use crate::utils::logging::log_counter_change;

#[derive(Debug)]
struct EventSlot {
    event: Event,
    registrations: Vec<Registration>,
    feedback: Vec<Feedback>,
    /// Set under the slot lock by `delete_event`; late arrivals see `NotFound`
    deleted: bool,
}

impl EventSlot {
    fn visible_to(&self, tenant_id: i64) -> bool {
        !self.deleted && self.event.college_id == tenant_id
    }

    fn has_live(&self, student_id: i64) -> bool {
        self.registrations
            .iter()
            .any(|r| r.student_id == student_id && r.status.is_live())
    }

    fn counters(&self) -> CounterDrift {
        let live = self.registrations.iter().filter(|r| r.status.is_live()).count();
        let attended = self
            .registrations
            .iter()
            .filter(|r| r.status == RegistrationStatus::Attended)
            .count();
        CounterDrift {
            event_id: self.event.id,
            stored_registered: i64::from(self.event.registered_count),
            actual_registered: live as i64,
            stored_attended: i64::from(self.event.attended_count),
            actual_attended: attended as i64,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    colleges: RwLock<HashMap<i64, College>>,
    users: RwLock<HashMap<i64, User>>,
    events: RwLock<HashMap<i64, Arc<Mutex<EventSlot>>>>,
    /// registration id -> event id
    registration_index: RwLock<HashMap<i64, i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn slot(&self, event_id: i64) -> Option<Arc<Mutex<EventSlot>>> {
        self.events.read().await.get(&event_id).cloned()
    }

    async fn slots(&self) -> Vec<Arc<Mutex<EventSlot>>> {
        self.events.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl CampusStore for MemoryStore {
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn create_college(&self, name: &str) -> Result<College> {
        let college = College {
            id: self.next_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.colleges.write().await.insert(college.id, college.clone());
        Ok(college)
    }

    async fn create_user(&self, request: &CreateUserRequest) -> Result<User> {
        if !self.colleges.read().await.contains_key(&request.college_id) {
            return Err(CampusError::not_found(Entity::College, request.college_id));
        }

        let mut users = self.users.write().await;
        if users.values().any(|user| user.email == request.email) {
            return Err(CampusError::conflict(ConflictReason::Duplicate));
        }
        let user = User {
            id: self.next_id(),
            college_id: request.college_id,
            name: request.name.clone(),
            email: request.email.clone(),
            role: request.role,
            events_attended: 0,
            is_active: true,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }

    async fn create_event(
        &self,
        tenant_id: i64,
        organizer_id: i64,
        request: &CreateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        let event = request.clone().into_event(self.next_id(), tenant_id, organizer_id, now);
        let slot = EventSlot {
            event: event.clone(),
            registrations: Vec::new(),
            feedback: Vec::new(),
            deleted: false,
        };
        self.events.write().await.insert(event.id, Arc::new(Mutex::new(slot)));
        Ok(event)
    }

    async fn update_event(
        &self,
        event_id: i64,
        tenant_id: i64,
        request: &UpdateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        let not_found = || CampusError::not_found(Entity::Event, event_id);
        let slot = self.slot(event_id).await.ok_or_else(not_found)?;
        let mut slot = slot.lock().await;
        if !slot.visible_to(tenant_id) {
            return Err(not_found());
        }

        slot.event = slot.event.apply_update(request, now)?;
        Ok(slot.event.clone())
    }

    async fn delete_event(&self, event_id: i64, tenant_id: i64) -> Result<DeletedEvent> {
        let not_found = || CampusError::not_found(Entity::Event, event_id);
        let slot = self.slot(event_id).await.ok_or_else(not_found)?;
        let mut slot = slot.lock().await;
        if !slot.visible_to(tenant_id) {
            return Err(not_found());
        }

        slot.deleted = true;
        let feedback_removed = slot.feedback.drain(..).count() as u64;
        let removed: Vec<Registration> = slot.registrations.drain(..).collect();

        self.events.write().await.remove(&event_id);
        let mut index = self.registration_index.write().await;
        for registration in &removed {
            index.remove(&registration.id);
        }

        Ok(DeletedEvent {
            event_id,
            registrations_removed: removed.len() as u64,
            feedback_removed,
        })
    }

    async fn find_event(&self, event_id: i64, tenant_id: i64) -> Result<Option<Event>> {
        let Some(slot) = self.slot(event_id).await else {
            return Ok(None);
        };
        let slot = slot.lock().await;
        Ok(slot.visible_to(tenant_id).then(|| slot.event.clone()))
    }

    async fn list_events(&self, tenant_id: i64, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            if slot.visible_to(tenant_id) && filter.matches(&slot.event) {
                events.push(slot.event.clone());
            }
        }
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));

        Ok(events
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }

    async fn popular_events(&self, tenant_id: i64, limit: i64) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            if slot.visible_to(tenant_id) && slot.event.status == EventStatus::Active {
                events.push(slot.event.clone());
            }
        }
        events.sort_by(|a, b| {
            b.registered_count
                .cmp(&a.registered_count)
                .then(a.date.cmp(&b.date))
                .then(a.id.cmp(&b.id))
        });
        events.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(events)
    }

    async fn event_categories(&self, tenant_id: i64) -> Result<Vec<EventCategory>> {
        let mut categories = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            if slot.visible_to(tenant_id) {
                categories.push(slot.event.category);
            }
        }
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn register(&self, student: &Actor, event_id: i64, now: DateTime<Utc>) -> Result<Registration> {
        let not_found = || CampusError::not_found(Entity::Event, event_id);
        let slot = self.slot(event_id).await.ok_or_else(not_found)?;
        let mut slot = slot.lock().await;
        if !slot.visible_to(student.tenant_id) || !slot.event.accepts_registrations() {
            return Err(not_found());
        }

        slot.event.ensure_can_register(now)?;
        if slot.has_live(student.user_id) {
            return Err(CampusError::conflict(ConflictReason::Duplicate));
        }

        let registration = Registration::new(self.next_id(), student.user_id, event_id, now);
        self.registration_index.write().await.insert(registration.id, event_id);
        slot.registrations.push(registration.clone());
        slot.event.registered_count += 1;
        slot.event.updated_at = now;

        log_counter_change(event_id, "registered_count", 1, slot.event.registered_count);
        Ok(registration)
    }

    async fn cancel(&self, student: &Actor, event_id: i64, now: DateTime<Utc>) -> Result<Registration> {
        let not_found = || CampusError::not_found(Entity::Registration, event_id);
        let slot = self.slot(event_id).await.ok_or_else(not_found)?;
        let mut slot = slot.lock().await;
        if !slot.visible_to(student.tenant_id) {
            return Err(not_found());
        }

        let position = slot
            .registrations
            .iter()
            .position(|r| r.student_id == student.user_id && r.status == RegistrationStatus::Registered)
            .ok_or_else(not_found)?;
        if slot.event.has_started(now) {
            return Err(CampusError::conflict(ConflictReason::EventStarted));
        }

        slot.registrations[position].mark_cancelled(now);
        slot.event.registered_count -= 1;
        slot.event.updated_at = now;

        log_counter_change(event_id, "registered_count", -1, slot.event.registered_count);
        Ok(slot.registrations[position].clone())
    }

    async fn student_registrations(
        &self,
        student_id: i64,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>> {
        let mut registrations = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            if slot.deleted {
                continue;
            }
            registrations.extend(
                slot.registrations
                    .iter()
                    .filter(|r| r.student_id == student_id)
                    .filter(|r| status.map_or(true, |status| r.status == status))
                    .cloned(),
            );
        }
        registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(registrations)
    }

    async fn event_registrations(&self, event_id: i64, tenant_id: i64) -> Result<Vec<Registration>> {
        let not_found = || CampusError::not_found(Entity::Event, event_id);
        let slot = self.slot(event_id).await.ok_or_else(not_found)?;
        let slot = slot.lock().await;
        if !slot.visible_to(tenant_id) {
            return Err(not_found());
        }
        Ok(slot.registrations.clone())
    }

    async fn attended_events(&self, student: &Actor) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            let attended = slot
                .registrations
                .iter()
                .any(|r| r.student_id == student.user_id && r.status == RegistrationStatus::Attended);
            if slot.visible_to(student.tenant_id) && attended {
                events.push(slot.event.clone());
            }
        }
        events.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(events)
    }

    async fn check_in(&self, registration_id: i64, tenant_id: i64, now: DateTime<Utc>) -> Result<Registration> {
        let not_found = || CampusError::not_found(Entity::Registration, registration_id);
        let event_id = self
            .registration_index
            .read()
            .await
            .get(&registration_id)
            .copied()
            .ok_or_else(not_found)?;
        let slot = self.slot(event_id).await.ok_or_else(not_found)?;
        let mut slot = slot.lock().await;
        if !slot.visible_to(tenant_id) {
            return Err(not_found());
        }

        let position = slot
            .registrations
            .iter()
            .position(|r| r.id == registration_id)
            .ok_or_else(not_found)?;
        slot.registrations[position].ensure_checkable()?;

        let student_id = slot.registrations[position].student_id;
        slot.registrations[position].mark_attended(now);
        slot.event.attended_count += 1;
        slot.event.updated_at = now;
        if let Some(student) = self.users.write().await.get_mut(&student_id) {
            student.events_attended += 1;
        }

        log_counter_change(event_id, "attended_count", 1, slot.event.attended_count);
        Ok(slot.registrations[position].clone())
    }

    async fn submit_feedback(
        &self,
        student: &Actor,
        event_id: i64,
        request: &SubmitFeedbackRequest,
        now: DateTime<Utc>,
    ) -> Result<Feedback> {
        let not_attended = || CampusError::conflict(ConflictReason::NotAttended);
        let slot = self.slot(event_id).await.ok_or_else(not_attended)?;
        let mut slot = slot.lock().await;
        if !slot.visible_to(student.tenant_id) {
            return Err(not_attended());
        }

        let attended = slot
            .registrations
            .iter()
            .any(|r| r.student_id == student.user_id && r.status == RegistrationStatus::Attended);
        if !attended {
            return Err(not_attended());
        }
        if slot.feedback.iter().any(|f| f.student_id == student.user_id) {
            return Err(CampusError::conflict(ConflictReason::Duplicate));
        }

        let feedback = Feedback {
            id: self.next_id(),
            student_id: student.user_id,
            event_id,
            rating: request.rating,
            comment: request.normalized_comment(),
            created_at: now,
        };
        slot.feedback.push(feedback.clone());
        Ok(feedback)
    }

    async fn event_feedback(&self, event_id: i64, tenant_id: i64) -> Result<Vec<Feedback>> {
        let not_found = || CampusError::not_found(Entity::Event, event_id);
        let slot = self.slot(event_id).await.ok_or_else(not_found)?;
        let slot = slot.lock().await;
        if !slot.visible_to(tenant_id) {
            return Err(not_found());
        }

        let mut feedback = slot.feedback.clone();
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(feedback)
    }

    async fn tenant_feedback(&self, tenant_id: i64, event_id: Option<i64>) -> Result<Vec<Feedback>> {
        let mut feedback = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            if slot.visible_to(tenant_id) && event_id.map_or(true, |id| slot.event.id == id) {
                feedback.extend(slot.feedback.iter().cloned());
            }
        }
        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(feedback)
    }

    async fn counter_snapshot(&self, tenant_id: Option<i64>) -> Result<Vec<CounterDrift>> {
        let mut rows = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            if !slot.deleted && tenant_id.map_or(true, |tenant| slot.event.college_id == tenant) {
                rows.push(slot.counters());
            }
        }
        rows.sort_by_key(|row| row.event_id);
        Ok(rows)
    }
}
