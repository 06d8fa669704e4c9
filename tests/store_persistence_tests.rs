//! File-backed store: reload, id sequences and corrupt-file recovery.

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tempfile::TempDir;
use tenant_notes::{
    models::SubscriptionPlan,
    repositories::{CreateNoteRequest, NoteRepository, TenantRepository},
    store::{LoadOutcome, Snapshot, Store},
};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{spawn_app_with, test_config};

fn note(tenant_id: i64, title: &str) -> CreateNoteRequest {
    CreateNoteRequest {
        tenant_id,
        user_id: 1,
        title: title.to_string(),
        content: "persisted".to_string(),
    }
}

#[tokio::test]
async fn fresh_file_is_seeded_and_written() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("data.json");

    let store = Store::open(&path).await?;
    assert_eq!(store.load_outcome(), &LoadOutcome::Fresh);
    assert!(path.exists());

    let on_disk: Snapshot = serde_json::from_slice(&std::fs::read(&path)?)?;
    assert_eq!(on_disk.tenants.len(), 2);
    assert_eq!(on_disk.users.len(), 4);
    assert!(on_disk.notes.is_empty());
    assert!(on_disk.tenants.iter().all(|t| t.subscription_plan == SubscriptionPlan::Free));

    Ok(())
}

#[tokio::test]
async fn mutations_survive_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.json");

    let acme_id = {
        let store = Store::open(&path).await?;
        let acme = TenantRepository::new(&store)
            .set_plan_by_slug("acme", SubscriptionPlan::Pro)
            .await?;
        NoteRepository::new(&store)
            .create_note(note(acme.id, "kept"), 3)
            .await?;
        acme.id
    };

    let reopened = Store::open(&path).await?;
    assert_eq!(reopened.load_outcome(), &LoadOutcome::Loaded);

    let acme = TenantRepository::new(&reopened).get_by_id(acme_id).await.unwrap();
    assert_eq!(acme.subscription_plan, SubscriptionPlan::Pro);
    let notes = NoteRepository::new(&reopened).list_by_tenant(acme_id).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "kept");
    assert_eq!(reopened.snapshot().await.users.len(), 4);

    Ok(())
}

#[tokio::test]
async fn ids_are_not_reused_after_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.json");

    let (acme_id, first_id) = {
        let store = Store::open(&path).await?;
        let acme = TenantRepository::new(&store).get_by_slug("acme").await.unwrap();
        let notes = NoteRepository::new(&store);
        let first = notes.create_note(note(acme.id, "one"), 3).await?;
        notes.delete_note(acme.id, first.id).await?;
        (acme.id, first.id)
    };

    let store = Store::open(&path).await?;
    let second = NoteRepository::new(&store)
        .create_note(note(acme_id, "two"), 3)
        .await?;
    assert!(second.id > first_id);

    Ok(())
}

#[tokio::test]
async fn corrupt_file_is_moved_aside() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.json");
    std::fs::write(&path, b"{ \"tenants\": [ oops")?;

    let store = Store::open(&path).await?;
    let LoadOutcome::Recovered { backup } = store.load_outcome() else {
        panic!("expected recovery, got {:?}", store.load_outcome());
    };

    assert_eq!(std::fs::read(backup)?, b"{ \"tenants\": [ oops");
    assert_eq!(store.snapshot().await.tenants.len(), 2);

    let rewritten: Snapshot = serde_json::from_slice(&std::fs::read(&path)?)?;
    assert_eq!(rewritten.users.len(), 4);

    Ok(())
}

#[tokio::test]
async fn recreate_discards_previous_state() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.json");

    {
        let store = Store::open(&path).await?;
        TenantRepository::new(&store)
            .set_plan_by_slug("globex", SubscriptionPlan::Pro)
            .await?;
    }

    let store = Store::recreate(&path).await?;
    let globex = TenantRepository::new(&store).get_by_slug("globex").await.unwrap();
    assert_eq!(globex.subscription_plan, SubscriptionPlan::Free);

    Ok(())
}

#[tokio::test]
async fn api_writes_reach_the_data_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.json");
    let store = Store::open(&path).await?;
    let app = spawn_app_with(test_config(), store).await?;

    let token = app.token("user@globex.test").await?;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/notes",
            &token,
            Some(json!({"title": "On disk", "content": "yes"})),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let on_disk: Snapshot = serde_json::from_slice(&std::fs::read(&path)?)?;
    assert_eq!(on_disk.notes.len(), 1);
    assert_eq!(on_disk.notes[0].title, "On disk");

    app.handle.shutdown().await
}

#[tokio::test]
async fn legacy_file_with_bcrypt_hashes_still_logs_in() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.json");
    let hash = bcrypt::hash("password", 4)?;
    let legacy = json!({
        "tenants": [
            {"id": 1, "slug": "acme", "name": "Acme Corp", "subscription_plan": "pro",
             "created_at": "2024-05-01T12:00:00.000Z"}
        ],
        "users": [
            {"id": 1, "email": "admin@acme.test", "password_hash": hash, "role": "admin",
             "tenant_id": 1, "created_at": "2024-05-01T12:00:00.000Z"}
        ],
        "notes": [
            {"id": 4, "title": "Old", "content": "from before", "tenant_id": 1, "user_id": 1,
             "created_at": "2024-05-02T08:00:00.000Z", "updated_at": "2024-05-02T08:00:00.000Z"}
        ]
    });
    std::fs::write(&path, serde_json::to_vec(&legacy)?)?;

    let store = Store::open(&path).await?;
    assert_eq!(store.load_outcome(), &LoadOutcome::Loaded);
    let app = spawn_app_with(test_config(), store).await?;

    let (status, session) = app.login("admin@acme.test", "password").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["tenant_slug"], "acme");

    let (status, body) = app.login("admin@acme.test", "wrong").await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let token = session["token"].as_str().unwrap_or_default();
    let (status, notes) = app.call(Method::GET, "/api/notes", token, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes[0]["title"], "Old");

    app.handle.shutdown().await
}

#[tokio::test]
async fn persist_failure_keeps_change_in_memory() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.json");
    let store = Store::open(&path).await?;

    // A directory where the file should be makes every write fail.
    std::fs::remove_file(&path)?;
    std::fs::create_dir(&path)?;

    let acme = TenantRepository::new(&store).get_by_slug("acme").await.unwrap();
    let created = NoteRepository::new(&store)
        .create_note(note(acme.id, "memory only"), 3)
        .await?;

    let notes = NoteRepository::new(&store).list_by_tenant(acme.id).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].id, created.id);
    assert!(path.is_dir());

    Ok(())
}
