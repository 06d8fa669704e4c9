//! File-backed record store for tenants, users and notes.
//!
//! The whole data set lives in memory behind a single `RwLock` and is written back
//! to one JSON document after every successful mutation. Writers are serialized by
//! the lock, and the write guard is held until the snapshot has been persisted.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::RepositoryError;
use crate::models::{Note, Tenant, User};
use crate::seeds;

/// Errors that prevent the store from opening.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read data file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write data file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to move corrupt data file {path} aside: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to seed default data: {0}")]
    Seed(#[from] RepositoryError),
}

/// Per-collection id high-water marks. Kept so ids are never handed out twice,
/// even after the record holding the maximum id is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
    #[serde(default)]
    pub tenants: i64,
    #[serde(default)]
    pub users: i64,
    #[serde(default)]
    pub notes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Tenants,
    Users,
    Notes,
}

/// The persisted document: three record arrays plus id sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tenants: Vec<Tenant>,
    pub users: Vec<User>,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub sequences: Sequences,
}

impl Snapshot {
    /// Allocates the next id for `collection`.
    pub fn next_id(&mut self, collection: Collection) -> i64 {
        let max_existing = match collection {
            Collection::Tenants => self.tenants.iter().map(|t| t.id).max(),
            Collection::Users => self.users.iter().map(|u| u.id).max(),
            Collection::Notes => self.notes.iter().map(|n| n.id).max(),
        }
        .unwrap_or(0);

        let sequence = match collection {
            Collection::Tenants => &mut self.sequences.tenants,
            Collection::Users => &mut self.sequences.users,
            Collection::Notes => &mut self.sequences.notes,
        };

        let next = (*sequence).max(max_existing) + 1;
        *sequence = next;
        next
    }
}

/// How the store obtained its initial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// An existing, well-formed data file was loaded.
    Loaded,
    /// No data file existed (or none is configured); started from seed data.
    Fresh,
    /// The data file was malformed. It was moved to `backup` and seed data was used.
    Recovered { backup: PathBuf },
}

struct StoreInner {
    path: Option<PathBuf>,
    data: RwLock<Snapshot>,
    outcome: LoadOutcome,
}

/// Process-wide store handle. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Opens the store backed by `path`, loading prior state when present and
    /// well-formed, then seeding any empty collection and persisting the result.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let (mut snapshot, outcome) = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Snapshot>(&bytes) {
                Ok(snapshot) => (snapshot, LoadOutcome::Loaded),
                Err(parse_err) => {
                    let backup = backup_path(&path);
                    tokio::fs::rename(&path, &backup)
                        .await
                        .map_err(|source| StoreError::Backup {
                            path: path.clone(),
                            source,
                        })?;
                    tracing::error!(
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %parse_err,
                        "Data file is malformed; moved it aside and starting from seed data"
                    );
                    (Snapshot::default(), LoadOutcome::Recovered { backup })
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No data file found; creating a new one");
                (Snapshot::default(), LoadOutcome::Fresh)
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        seeds::seed_defaults(&mut snapshot)?;
        write_snapshot(&path, &snapshot).await?;

        tracing::info!(
            path = %path.display(),
            tenants = snapshot.tenants.len(),
            users = snapshot.users.len(),
            notes = snapshot.notes.len(),
            "Store opened"
        );

        Ok(Self::from_parts(Some(path), snapshot, outcome))
    }

    /// Discards any existing data file and writes fresh seed data to `path`.
    pub async fn recreate(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut snapshot = Snapshot::default();
        seeds::seed_defaults(&mut snapshot)?;
        write_snapshot(&path, &snapshot).await?;
        tracing::warn!(path = %path.display(), "Data file recreated from seed data");
        Ok(Self::from_parts(Some(path), snapshot, LoadOutcome::Fresh))
    }

    /// Creates a store seeded with default data that never touches the filesystem.
    pub fn in_memory() -> Result<Self, StoreError> {
        let mut snapshot = Snapshot::default();
        seeds::seed_defaults(&mut snapshot)?;
        Ok(Self::from_parts(None, snapshot, LoadOutcome::Fresh))
    }

    fn from_parts(path: Option<PathBuf>, snapshot: Snapshot, outcome: LoadOutcome) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path,
                data: RwLock::new(snapshot),
                outcome,
            }),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.inner.outcome
    }

    /// Runs `f` against a shared view of the data.
    pub async fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let guard = self.inner.data.read().await;
        f(&guard)
    }

    /// Runs `f` under the exclusive write guard and persists the snapshot when it
    /// returns `Ok`. `f` must leave the data untouched when it returns `Err`.
    ///
    /// A persist failure is logged and counted but not reported to the caller;
    /// the in-memory state keeps the change.
    pub async fn mutate<R, E>(&self, f: impl FnOnce(&mut Snapshot) -> Result<R, E>) -> Result<R, E> {
        let mut guard = self.inner.data.write().await;
        let result = f(&mut guard)?;

        if let Some(path) = &self.inner.path
            && let Err(err) = write_snapshot(path, &guard).await
        {
            counter!("store_persist_failures_total").increment(1);
            tracing::error!(
                path = %path.display(),
                error = %err,
                "Failed to persist data file; in-memory state has diverged from disk"
            );
        }

        Ok(result)
    }

    /// Returns a copy of the current data.
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.data.read().await.clone()
    }
}

async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(snapshot)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
    }

    // Write-then-rename so a crash mid-write never leaves a truncated document.
    let tmp = sibling_path(path, "tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn backup_path(path: &Path) -> PathBuf {
    sibling_path(path, &format!("corrupt-{}", Utc::now().timestamp()))
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "data.json".into());
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
