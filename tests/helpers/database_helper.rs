//! Test database helper utilities
//!
//! PostgreSQL tests run only when `TEST_DATABASE_URL` points at a database
//! the tests may wipe. Callers should also be marked `#[serial]`.

use std::sync::Arc;
use sqlx::PgPool;
use campus_events::database::run_migrations;
use campus_events::DatabaseService;
use super::test_context::TestContext;

pub struct TestDatabase {
    pub pool: PgPool,
}

impl TestDatabase {
    /// Connect, migrate and truncate; `None` when no test database is configured
    pub async fn connect() -> Option<Self> {
        let url = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL test");
                return None;
            }
        };

        let pool = PgPool::connect(&url).await.expect("connect to test database");
        run_migrations(&pool).await.expect("run migrations");

        let database = Self { pool };
        database.cleanup().await;
        Some(database)
    }

    pub async fn cleanup(&self) {
        sqlx::query("TRUNCATE feedback, registrations, events, users, colleges RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await
            .expect("truncate tables");
    }

    pub async fn context(&self) -> TestContext {
        TestContext::with_store(Arc::new(DatabaseService::new(self.pool.clone()))).await
    }
}
