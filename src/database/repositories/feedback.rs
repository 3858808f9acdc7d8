//! Feedback repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Utc};
use crate::models::feedback::{Feedback, SubmitFeedbackRequest};
use crate::utils::errors::{CampusError, ConflictReason};

#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Feedback for an event, newest first
    pub async fn for_event(&self, event_id: i64) -> Result<Vec<Feedback>, CampusError> {
        let feedback = sqlx::query_as::<_, Feedback>(
            "SELECT * FROM feedback WHERE event_id = $1 ORDER BY created_at DESC, id DESC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(feedback)
    }

    /// Feedback across a tenant's events, optionally one event, newest first
    pub async fn for_tenant(&self, college_id: i64, event_id: Option<i64>) -> Result<Vec<Feedback>, CampusError> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT f.*
            FROM feedback f
            INNER JOIN events e ON e.id = f.event_id
            WHERE e.college_id = $1 AND ($2::INT8 IS NULL OR f.event_id = $2)
            ORDER BY f.created_at DESC, f.id DESC
            "#
        )
        .bind(college_id)
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(feedback)
    }

    pub async fn exists(conn: &mut PgConnection, student_id: i64, event_id: i64) -> Result<bool, CampusError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM feedback WHERE student_id = $1 AND event_id = $2)"
        )
        .bind(student_id)
        .bind(event_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// Insert feedback; a concurrent duplicate surfaces as `Conflict(duplicate)`
    pub async fn insert(
        conn: &mut PgConnection,
        student_id: i64,
        event_id: i64,
        request: &SubmitFeedbackRequest,
        now: DateTime<Utc>,
    ) -> Result<Feedback, CampusError> {
        sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (student_id, event_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#
        )
        .bind(student_id)
        .bind(event_id)
        .bind(request.rating)
        .bind(request.normalized_comment())
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| CampusError::from_unique_violation(e, ConflictReason::Duplicate))
    }

    /// Remove every feedback row of an event, returning the number removed
    pub async fn delete_for_event(conn: &mut PgConnection, event_id: i64) -> Result<u64, CampusError> {
        let result = sqlx::query("DELETE FROM feedback WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}
