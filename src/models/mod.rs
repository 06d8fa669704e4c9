//! # Data Models
//!
//! Records held by the persistence store plus small response types shared by handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod note;
pub mod tenant;
pub mod user;

pub use note::Note;
pub use tenant::{SubscriptionPlan, Tenant};
pub use user::{Role, RoleParseError, User};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "tenant-notes".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Liveness probe response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
