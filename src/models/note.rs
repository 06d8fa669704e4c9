//! Note record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note owned by a tenant. Any member of the owning tenant may read, update or delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub tenant_id: i64,
    /// Creator of the note
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
