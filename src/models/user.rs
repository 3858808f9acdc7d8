//! Tenant, user and caller-identity models
//!
//! Identity is issued by an external layer; this crate only consumes the
//! resulting [`Actor`] and checks its role against a closed capability set.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct College {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Faculty,
    Student,
}

/// Operations gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    BrowseEvents,
    Register,
    SubmitFeedback,
    ManageEvents,
    CheckIn,
    ViewRegistrations,
}

impl Role {
    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Role::Student => matches!(
                capability,
                Capability::BrowseEvents | Capability::Register | Capability::SubmitFeedback
            ),
            Role::Admin | Role::Faculty => matches!(
                capability,
                Capability::BrowseEvents
                    | Capability::ManageEvents
                    | Capability::CheckIn
                    | Capability::ViewRegistrations
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub college_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Lifetime check-in counter, bumped by the attendance processor
    pub events_attended: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub college_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The authenticated caller of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub tenant_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, tenant_id: i64, role: Role) -> Self {
        Self { user_id, tenant_id, role }
    }

    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            Err(CampusError::Forbidden(format!(
                "{:?} role cannot perform {:?}",
                self.role, capability
            )))
        }
    }
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.college_id, self.role)
    }
}
