//! # Note Repository
//!
//! Tenant-scoped note CRUD. The free-plan limit is enforced here, inside the same
//! write guard as the insert, so concurrent creates cannot overshoot the cap.

use chrono::{DateTime, Duration, Utc};

use crate::error::RepositoryError;
use crate::models::{Note, SubscriptionPlan};
use crate::store::{Collection, Store};

const NOTE_NOT_FOUND: &str = "Note not found";

/// Request data for creating a new note
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub tenant_id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
}

/// Replacement title and content for an existing note
#[derive(Debug, Clone)]
pub struct UpdateNoteRequest {
    pub title: String,
    pub content: String,
}

/// Repository for Note records
pub struct NoteRepository<'a> {
    store: &'a Store,
}

impl<'a> NoteRepository<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// List a tenant's notes, most recently updated first (ties broken by higher id).
    pub async fn list_by_tenant(&self, tenant_id: i64) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .store
            .read(|data| {
                data.notes
                    .iter()
                    .filter(|n| n.tenant_id == tenant_id)
                    .cloned()
                    .collect()
            })
            .await;

        notes.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        notes
    }

    /// Get one note. A note owned by another tenant is reported as not found.
    pub async fn get(&self, tenant_id: i64, note_id: i64) -> Result<Note, RepositoryError> {
        self.store
            .read(|data| {
                data.notes
                    .iter()
                    .find(|n| n.id == note_id && n.tenant_id == tenant_id)
                    .cloned()
            })
            .await
            .ok_or_else(|| RepositoryError::not_found(NOTE_NOT_FOUND))
    }

    /// Count a tenant's notes
    pub async fn count_by_tenant(&self, tenant_id: i64) -> usize {
        self.store
            .read(|data| data.notes.iter().filter(|n| n.tenant_id == tenant_id).count())
            .await
    }

    /// Create a note. Tenants on the free plan are capped at `free_limit` notes.
    pub async fn create_note(
        &self,
        request: CreateNoteRequest,
        free_limit: usize,
    ) -> Result<Note, RepositoryError> {
        self.store
            .mutate(|data| {
                let tenant = data
                    .tenants
                    .iter()
                    .find(|t| t.id == request.tenant_id)
                    .ok_or_else(|| RepositoryError::not_found("Tenant not found"))?;

                if tenant.subscription_plan == SubscriptionPlan::Free {
                    let existing = data
                        .notes
                        .iter()
                        .filter(|n| n.tenant_id == request.tenant_id)
                        .count();
                    if existing >= free_limit {
                        return Err(RepositoryError::PlanLimitReached { limit: free_limit });
                    }
                }

                let now = Utc::now();
                let note = Note {
                    id: data.next_id(Collection::Notes),
                    title: request.title,
                    content: request.content,
                    tenant_id: request.tenant_id,
                    user_id: request.user_id,
                    created_at: now,
                    updated_at: now,
                };
                data.notes.push(note.clone());
                Ok(note)
            })
            .await
    }

    /// Replace a note's title and content. `updated_at` always moves forward.
    pub async fn update_note(
        &self,
        tenant_id: i64,
        note_id: i64,
        update: UpdateNoteRequest,
    ) -> Result<Note, RepositoryError> {
        self.store
            .mutate(|data| {
                let note = data
                    .notes
                    .iter_mut()
                    .find(|n| n.id == note_id && n.tenant_id == tenant_id)
                    .ok_or_else(|| RepositoryError::not_found(NOTE_NOT_FOUND))?;

                note.title = update.title;
                note.content = update.content;
                note.updated_at = advance(note.updated_at, Utc::now());
                Ok(note.clone())
            })
            .await
    }

    /// Delete a note
    pub async fn delete_note(&self, tenant_id: i64, note_id: i64) -> Result<(), RepositoryError> {
        self.store
            .mutate(|data| {
                let index = data
                    .notes
                    .iter()
                    .position(|n| n.id == note_id && n.tenant_id == tenant_id)
                    .ok_or_else(|| RepositoryError::not_found(NOTE_NOT_FOUND))?;
                data.notes.remove(index);
                Ok(())
            })
            .await
    }
}

/// `now`, or one microsecond past `previous` when the clock has not moved.
fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
