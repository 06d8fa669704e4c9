//! # Notes API Handlers
//!
//! Every operation is scoped to the caller's tenant. Note ids that do not parse,
//! do not exist, or belong to another tenant all produce the same 404.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthUser, require_role};
use crate::error::{ApiError, RepositoryError, bad_request, not_found};
use crate::models::{Note, Role};
use crate::repositories::{CreateNoteRequest, NoteRepository, UpdateNoteRequest};
use crate::server::AppState;

/// Roles allowed to manage notes
const NOTE_ROLES: &[Role] = &[Role::Admin, Role::Member];

/// Title and content of a note
#[derive(Debug, Deserialize, ToSchema)]
pub struct NotePayload {
    #[schema(example = "Quarterly plan")]
    #[serde(default, deserialize_with = "super::non_blank")]
    pub title: Option<String>,
    #[schema(example = "Ship the thing.")]
    #[serde(default, deserialize_with = "super::non_blank")]
    pub content: Option<String>,
}

impl NotePayload {
    fn into_parts(self) -> Result<(String, String), ApiError> {
        match (self.title, self.content) {
            (Some(title), Some(content)) => Ok((title, content)),
            _ => Err(bad_request("Title and content are required")),
        }
    }
}

/// Note as returned to clients
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NoteResponse {
    #[schema(example = 1)]
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

/// Confirmation message
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Note deleted successfully")]
    pub message: String,
}

fn parse_note_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| not_found("Note not found"))
}

/// List the caller's tenant notes, most recently updated first
#[utoipa::path(
    get,
    path = "/api/notes",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notes of the caller's tenant", body = [NoteResponse]),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError)
    ),
    tag = "notes"
)]
pub async fn list_notes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<NoteResponse>>, ApiError> {
    require_role(&user, NOTE_ROLES)?;

    let notes = NoteRepository::new(&state.store)
        .list_by_tenant(user.tenant_id)
        .await;

    Ok(Json(notes.into_iter().map(NoteResponse::from).collect()))
}

/// Create a note in the caller's tenant
#[utoipa::path(
    post,
    path = "/api/notes",
    security(("bearer_auth" = [])),
    request_body = NotePayload,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Title or content missing", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 403, description = "Free plan note limit reached (code PLAN_LIMIT_REACHED)", body = ApiError)
    ),
    tag = "notes"
)]
pub async fn create_note(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<NotePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
    require_role(&user, NOTE_ROLES)?;
    let Json(payload) = payload?;
    let (title, content) = payload.into_parts()?;

    let request = CreateNoteRequest {
        tenant_id: user.tenant_id,
        user_id: user.id,
        title,
        content,
    };

    let note = NoteRepository::new(&state.store)
        .create_note(request, state.config.free_plan_note_limit)
        .await
        .inspect_err(|e| {
            if let RepositoryError::PlanLimitReached { limit } = e {
                counter!("notes_plan_limit_rejections_total").increment(1);
                tracing::info!(tenant_id = user.tenant_id, limit, "Free plan note limit reached");
            }
        })?;

    counter!("notes_created_total").increment(1);
    tracing::info!(note_id = note.id, tenant_id = note.tenant_id, user_id = user.id, "Note created");

    Ok((StatusCode::CREATED, Json(note.into())))
}

/// Fetch one note
#[utoipa::path(
    get,
    path = "/api/notes/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "The note", body = NoteResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Note not found", body = ApiError)
    ),
    tag = "notes"
)]
pub async fn get_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, ApiError> {
    let note_id = parse_note_id(&id)?;
    let note = NoteRepository::new(&state.store)
        .get(user.tenant_id, note_id)
        .await?;
    Ok(Json(note.into()))
}

/// Replace a note's title and content
#[utoipa::path(
    put,
    path = "/api/notes/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body = NotePayload,
    responses(
        (status = 200, description = "Note updated", body = NoteResponse),
        (status = 400, description = "Title or content missing", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Note not found", body = ApiError)
    ),
    tag = "notes"
)]
pub async fn update_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<NotePayload>, JsonRejection>,
) -> Result<Json<NoteResponse>, ApiError> {
    let Json(payload) = payload?;
    let (title, content) = payload.into_parts()?;
    let note_id = parse_note_id(&id)?;

    let note = NoteRepository::new(&state.store)
        .update_note(user.tenant_id, note_id, UpdateNoteRequest { title, content })
        .await?;

    tracing::info!(note_id, tenant_id = user.tenant_id, "Note updated");
    Ok(Json(note.into()))
}

/// Delete a note
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Note not found", body = ApiError)
    ),
    tag = "notes"
)]
pub async fn delete_note(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let note_id = parse_note_id(&id)?;

    NoteRepository::new(&state.store)
        .delete_note(user.tenant_id, note_id)
        .await?;

    tracing::info!(note_id, tenant_id = user.tenant_id, "Note deleted");
    Ok(Json(MessageResponse {
        message: "Note deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn notes_require_authentication() {
        let (_state, app) = setup_test_app();

        let (status, body) = send(&app, "GET", "/api/notes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
    }

    #[tokio::test]
    async fn create_then_fetch_round_trip() {
        let (state, app) = setup_test_app();
        let token = token_for(&state, "user@acme.test").await;

        let (status, created) = send(
            &app,
            "POST",
            "/api/notes",
            Some(&token),
            Some(json!({"title": "Hello", "content": "World"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["title"], "Hello");
        assert_eq!(created["created_at"], created["updated_at"]);
        assert!(created.get("tenant_id").is_none());

        let uri = format!("/api/notes/{}", created["id"]);
        let (status, fetched) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn title_only_is_rejected() {
        let (state, app) = setup_test_app();
        let token = token_for(&state, "admin@acme.test").await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/notes",
            Some(&token),
            Some(json!({"title": "No body"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Title and content are required");

        let (status, _) = send(
            &app,
            "POST",
            "/api/notes",
            Some(&token),
            Some(json!({"title": "Blank", "content": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fourth_note_on_free_plan_is_plan_limited() {
        let (state, app) = setup_test_app();
        let token = token_for(&state, "user@acme.test").await;

        for i in 0..3 {
            let (status, _) = send(
                &app,
                "POST",
                "/api/notes",
                Some(&token),
                Some(json!({"title": format!("n{i}"), "content": "x"})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = send(
            &app,
            "POST",
            "/api/notes",
            Some(&token),
            Some(json!({"title": "n3", "content": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "PLAN_LIMIT_REACHED");
        assert_eq!(body["error"], "Free plan limited to 3 notes. Please upgrade to Pro.");
    }

    #[tokio::test]
    async fn other_tenant_sees_not_found() {
        let (state, app) = setup_test_app();
        let acme = token_for(&state, "admin@acme.test").await;
        let globex = token_for(&state, "admin@globex.test").await;

        let (_, created) = send(
            &app,
            "POST",
            "/api/notes",
            Some(&acme),
            Some(json!({"title": "Secret", "content": "Acme only"})),
        )
        .await;
        let uri = format!("/api/notes/{}", created["id"]);

        let (status, body) = send(&app, "GET", &uri, Some(&globex), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Note not found");

        let (status, _) = send(
            &app,
            "PUT",
            &uri,
            Some(&globex),
            Some(json!({"title": "Mine", "content": "now"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "DELETE", &uri, Some(&globex), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = send(&app, "GET", "/api/notes", Some(&globex), None).await;
        assert_eq!(listed, json!([]));

        let (status, _) = send(&app, "GET", &uri, Some(&acme), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (state, app) = setup_test_app();
        let token = token_for(&state, "user@globex.test").await;

        let (_, created) = send(
            &app,
            "POST",
            "/api/notes",
            Some(&token),
            Some(json!({"title": "Draft", "content": "v1"})),
        )
        .await;
        let uri = format!("/api/notes/{}", created["id"]);

        let (status, updated) = send(
            &app,
            "PUT",
            &uri,
            Some(&token),
            Some(json!({"title": "Final", "content": "v2"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["content"], "v2");
        assert_eq!(updated["created_at"], created["created_at"]);
        assert_ne!(updated["updated_at"], created["updated_at"]);

        let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Note deleted successfully");

        let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_id_is_not_found() {
        let (state, app) = setup_test_app();
        let token = token_for(&state, "user@acme.test").await;

        let (status, body) = send(&app, "GET", "/api/notes/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Note not found");
    }
}
