//! Services module
//!
//! This module contains the business-facing services. Each one checks the
//! caller's capability, delegates the atomic work to a `CampusStore`, and
//! logs the outcome.

pub mod attendance;
pub mod catalog;
pub mod feedback;
pub mod ledger;
pub mod retry;

// Re-export commonly used services
pub use attendance::AttendanceProcessor;
pub use catalog::CatalogService;
pub use feedback::FeedbackGate;
pub use ledger::RegistrationLedger;
pub use retry::{with_retry, RetryPolicy};

use std::sync::Arc;
use serde::Serialize;
use tracing::warn;
use crate::config::settings::Settings;
use crate::database::CampusStore;

/// Service factory wiring every service over one shared store
#[derive(Clone)]
pub struct ServiceFactory {
    store: Arc<dyn CampusStore>,
    pub catalog: CatalogService,
    pub ledger: RegistrationLedger,
    pub attendance: AttendanceProcessor,
    pub feedback: FeedbackGate,
}

impl ServiceFactory {
    pub fn new(store: Arc<dyn CampusStore>, settings: &Settings) -> Self {
        let retry = RetryPolicy::from_config(&settings.registration);

        Self {
            catalog: CatalogService::new(store.clone(), retry.clone()),
            ledger: RegistrationLedger::new(store.clone(), retry.clone()),
            attendance: AttendanceProcessor::new(store.clone(), retry),
            feedback: FeedbackGate::new(store.clone()),
            store,
        }
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let store_healthy = match self.store.health_check().await {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, "Store health check failed");
                false
            }
        };

        ServiceHealthStatus { store_healthy }
    }
}

/// Health status for all services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub store_healthy: bool,
}

impl ServiceHealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.store_healthy
    }
}
