//! Registration repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::registration::{Registration, RegistrationStatus};
use crate::utils::errors::{CampusError, ConflictReason};

#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A student's registrations, newest first
    pub async fn for_student(
        &self,
        student_id: i64,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<Registration>, CampusError> {
        let registrations = sqlx::query_as::<_, Registration>(
            r#"
            SELECT * FROM registrations
            WHERE student_id = $1 AND ($2::registration_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            "#
        )
        .bind(student_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// All registrations for an event, oldest first
    pub async fn for_event(&self, event_id: i64) -> Result<Vec<Registration>, CampusError> {
        let registrations = sqlx::query_as::<_, Registration>(
            "SELECT * FROM registrations WHERE event_id = $1 ORDER BY created_at ASC, id ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(registrations)
    }

    /// Event id of a registration, visible only through its event's tenant
    pub async fn event_id_of(conn: &mut PgConnection, id: i64, college_id: i64) -> Result<Option<i64>, CampusError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT r.event_id
            FROM registrations r
            INNER JOIN events e ON e.id = r.event_id
            WHERE r.id = $1 AND e.college_id = $2
            "#
        )
        .bind(id)
        .bind(college_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|(event_id,)| event_id))
    }

    /// Check for a registered or attended row
    pub async fn has_live(conn: &mut PgConnection, student_id: i64, event_id: i64) -> Result<bool, CampusError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM registrations
                WHERE student_id = $1 AND event_id = $2 AND status IN ('registered', 'attended')
            )
            "#
        )
        .bind(student_id)
        .bind(event_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// Check for an attended row
    pub async fn has_attended(conn: &mut PgConnection, student_id: i64, event_id: i64) -> Result<bool, CampusError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM registrations
                WHERE student_id = $1 AND event_id = $2 AND status = 'attended'
            )
            "#
        )
        .bind(student_id)
        .bind(event_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// Insert a new `registered` row
    pub async fn insert(
        conn: &mut PgConnection,
        student_id: i64,
        event_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Registration, CampusError> {
        sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (student_id, event_id, status, created_at, updated_at)
            VALUES ($1, $2, 'registered', $3, $3)
            RETURNING *
            "#
        )
        .bind(student_id)
        .bind(event_id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| CampusError::from_unique_violation(e, ConflictReason::Duplicate))
    }

    /// Lock the student's `registered` row for an event
    pub async fn lock_registered(
        conn: &mut PgConnection,
        student_id: i64,
        event_id: i64,
    ) -> Result<Option<Registration>, CampusError> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            SELECT * FROM registrations
            WHERE student_id = $1 AND event_id = $2 AND status = 'registered'
            FOR UPDATE
            "#
        )
        .bind(student_id)
        .bind(event_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(registration)
    }

    /// Lock a registration row by ID
    pub async fn lock(conn: &mut PgConnection, id: i64) -> Result<Option<Registration>, CampusError> {
        let registration = sqlx::query_as::<_, Registration>(
            "SELECT * FROM registrations WHERE id = $1 FOR UPDATE"
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(registration)
    }

    /// Persist status and check-in time of a locked row
    pub async fn save_status(conn: &mut PgConnection, registration: &Registration) -> Result<Registration, CampusError> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            UPDATE registrations
            SET status = $2, check_in_time = $3, updated_at = $4
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(registration.id)
        .bind(registration.status)
        .bind(registration.check_in_time)
        .bind(registration.updated_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(registration)
    }

    /// Remove every registration of an event, returning the number removed
    pub async fn delete_for_event(conn: &mut PgConnection, event_id: i64) -> Result<u64, CampusError> {
        let result = sqlx::query("DELETE FROM registrations WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}
