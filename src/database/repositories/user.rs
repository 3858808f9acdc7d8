//! User and college repository implementation

use sqlx::{PgConnection, PgPool};
use crate::models::user::{College, CreateUserRequest, User};
use crate::utils::errors::{CampusError, ConflictReason};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new college
    pub async fn create_college(&self, name: &str) -> Result<College, CampusError> {
        let college = sqlx::query_as::<_, College>(
            "INSERT INTO colleges (name) VALUES ($1) RETURNING id, name, created_at"
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(college)
    }

    /// Create a new user
    pub async fn create(&self, request: &CreateUserRequest) -> Result<User, CampusError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (college_id, name, email, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, college_id, name, email, role, events_attended, is_active, created_at
            "#
        )
        .bind(request.college_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(request.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CampusError::from_unique_violation(e, ConflictReason::Duplicate))?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, CampusError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, college_id, name, email, role, events_attended, is_active, created_at FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Bump the student's lifetime check-in counter inside a check-in transaction
    pub async fn increment_events_attended(conn: &mut PgConnection, id: i64) -> Result<(), CampusError> {
        sqlx::query("UPDATE users SET events_attended = events_attended + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
