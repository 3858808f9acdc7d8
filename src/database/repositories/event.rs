//! Event repository implementation
//!
//! Read queries run on the pool. Anything that touches the derived
//! counters takes a `&mut PgConnection` belonging to an open transaction
//! that already holds the event row lock.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use chrono::{DateTime, Utc};
use crate::models::event::{CounterDrift, CreateEventRequest, Event, EventCategory, EventFilter};
use crate::utils::errors::CampusError;

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event with zeroed counters
    pub async fn create(
        &self,
        college_id: i64,
        organizer_id: i64,
        request: &CreateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event, CampusError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (
                college_id, organizer_id, title, description, date, location, category,
                max_attendees, registered_count, attended_count, status, requirements, tags,
                is_registration_open, registration_deadline, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 0, $9, $10, $11, $12, $13, $14, $14)
            RETURNING *
            "#
        )
        .bind(college_id)
        .bind(organizer_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.date)
        .bind(&request.location)
        .bind(request.category)
        .bind(request.max_attendees)
        .bind(request.status.unwrap_or(crate::models::EventStatus::Active))
        .bind(&request.requirements)
        .bind(&request.tags)
        .bind(request.is_registration_open.unwrap_or(true))
        .bind(request.registration_deadline)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID within a tenant
    pub async fn find_by_id(&self, id: i64, college_id: i64) -> Result<Option<Event>, CampusError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE id = $1 AND college_id = $2"
        )
        .bind(id)
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// List a tenant's events matching a filter, soonest first
    pub async fn list(&self, college_id: i64, filter: &EventFilter) -> Result<Vec<Event>, CampusError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM events WHERE college_id = ");
        query.push_bind(college_id);

        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(from) = filter.from {
            query.push(" AND date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND date <= ").push_bind(to);
        }
        if filter.registration_open_only {
            query.push(" AND is_registration_open = TRUE");
        }

        query.push(" ORDER BY date ASC, id ASC LIMIT ").push_bind(filter.limit());
        query.push(" OFFSET ").push_bind(filter.offset());

        let events = query.build_query_as::<Event>().fetch_all(&self.pool).await?;
        Ok(events)
    }

    /// Active events ranked by registrations
    pub async fn popular(&self, college_id: i64, limit: i64) -> Result<Vec<Event>, CampusError> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE college_id = $1 AND status = 'active'
            ORDER BY registered_count DESC, date ASC, id ASC
            LIMIT $2
            "#
        )
        .bind(college_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Categories in use by a tenant, in enum order
    pub async fn categories(&self, college_id: i64) -> Result<Vec<EventCategory>, CampusError> {
        let rows: Vec<(EventCategory,)> = sqlx::query_as(
            "SELECT DISTINCT category FROM events WHERE college_id = $1 ORDER BY category"
        )
        .bind(college_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(category,)| category).collect())
    }

    /// Events a student checked in to, newest first
    pub async fn attended_by(&self, student_id: i64, college_id: i64) -> Result<Vec<Event>, CampusError> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT e.*
            FROM events e
            INNER JOIN registrations r ON r.event_id = e.id
            WHERE r.student_id = $1 AND r.status = 'attended' AND e.college_id = $2
            ORDER BY e.date DESC
            "#
        )
        .bind(student_id)
        .bind(college_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Stored counters next to the counts derived from registration rows
    pub async fn counter_snapshot(&self, college_id: Option<i64>) -> Result<Vec<CounterDrift>, CampusError> {
        let rows = sqlx::query_as::<_, CounterDrift>(
            r#"
            SELECT
                e.id AS event_id,
                e.registered_count::INT8 AS stored_registered,
                (SELECT COUNT(*) FROM registrations r
                 WHERE r.event_id = e.id AND r.status IN ('registered', 'attended')) AS actual_registered,
                e.attended_count::INT8 AS stored_attended,
                (SELECT COUNT(*) FROM registrations r
                 WHERE r.event_id = e.id AND r.status = 'attended') AS actual_attended
            FROM events e
            WHERE $1::INT8 IS NULL OR e.college_id = $1
            ORDER BY e.id
            "#
        )
        .bind(college_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lock a tenant's event row for the rest of the transaction
    pub async fn lock(conn: &mut PgConnection, id: i64, college_id: i64) -> Result<Option<Event>, CampusError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE id = $1 AND college_id = $2 FOR UPDATE"
        )
        .bind(id)
        .bind(college_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(event)
    }

    /// Share-lock a tenant's event row so it cannot be deleted under us
    pub async fn lock_shared(conn: &mut PgConnection, id: i64, college_id: i64) -> Result<Option<Event>, CampusError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE id = $1 AND college_id = $2 FOR SHARE"
        )
        .bind(id)
        .bind(college_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(event)
    }

    /// Write back every mutable field of a locked event. Counters are left alone.
    pub async fn save_fields(conn: &mut PgConnection, event: &Event) -> Result<Event, CampusError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET title = $2,
                description = $3,
                date = $4,
                location = $5,
                category = $6,
                max_attendees = $7,
                status = $8,
                requirements = $9,
                tags = $10,
                is_registration_open = $11,
                registration_deadline = $12,
                updated_at = $13
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(event.category)
        .bind(event.max_attendees)
        .bind(event.status)
        .bind(&event.requirements)
        .bind(&event.tags)
        .bind(event.is_registration_open)
        .bind(event.registration_deadline)
        .bind(event.updated_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(event)
    }

    /// Adjust `registered_count` on a locked event, returning the new value
    pub async fn adjust_registered(
        conn: &mut PgConnection,
        id: i64,
        delta: i32,
        now: DateTime<Utc>,
    ) -> Result<i32, CampusError> {
        let (count,): (i32,) = sqlx::query_as(
            "UPDATE events SET registered_count = registered_count + $2, updated_at = $3 WHERE id = $1 RETURNING registered_count"
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Increment `attended_count` on a locked event, returning the new value
    pub async fn increment_attended(conn: &mut PgConnection, id: i64, now: DateTime<Utc>) -> Result<i32, CampusError> {
        let (count,): (i32,) = sqlx::query_as(
            "UPDATE events SET attended_count = attended_count + 1, updated_at = $2 WHERE id = $1 RETURNING attended_count"
        )
        .bind(id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Delete event row; dependents must already be gone
    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<(), CampusError> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
