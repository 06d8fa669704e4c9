//! Tenant record and subscription plan.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subscription tier controlling note-count limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Pro,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Pro => "pro",
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An isolated customer organization. All users and notes are partitioned by tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tenant {
    /// Unique, immutable identifier
    #[schema(example = 1)]
    pub id: i64,
    /// Unique, URL-safe identifier
    #[schema(example = "acme")]
    pub slug: String,
    /// Display name
    #[schema(example = "Acme Corp")]
    pub name: String,
    pub subscription_plan: SubscriptionPlan,
    pub created_at: DateTime<Utc>,
}
