//! Persistence boundary for tasks.
//!
//! Two interchangeable backends implement [`TaskStore`]: a relational store
//! ([`DbTaskStore`]) and a single JSON file ([`JsonFileStore`]). Which one is
//! used is decided once at startup by [`connect_store`].

use crate::config::{Config, StoreKind};
use crate::task::{Task, TaskChanges};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use std::time::Duration;

mod db;
mod json;

pub use db::DbTaskStore;
pub use json::JsonFileStore;

/// Errors surfaced by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Corrupted task record {id}: {reason}")]
    Corrupted { id: String, reason: String },
}

/// Operations every task backend provides.
///
/// Lookups return `Ok(None)` for absent tasks; deciding whether absence is an
/// error is left to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persists a new task.
    async fn create(&self, task: &Task) -> Result<(), StoreError>;

    /// Fetches a task with its children populated.
    async fn get_by_id(&self, id: &str) -> Result<Option<Task>, StoreError>;

    /// Fetches every task with children populated, in store order.
    async fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Applies the fields present in `changes` and stamps `updated_at`.
    /// Returns `Ok(None)` when no task was updated.
    async fn patch(
        &self,
        id: &str,
        changes: &TaskChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError>;

    /// Removes a task and detaches its children.
    /// Returns `Ok(false)` when there was nothing to remove.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// Opens the backend selected by `config`.
///
/// The database backend gets a bounded connection pool and has its
/// migrations applied before it is handed out.
#[tracing::instrument(skip(config))]
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn TaskStore>> {
    match config.store {
        StoreKind::Json => {
            tracing::info!("Using JSON file store at {}", config.tasks_path.display());
            Ok(Arc::new(JsonFileStore::new(&config.tasks_path)))
        }
        StoreKind::Database => {
            let db_url = config.db_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("ADVISOR_DB_URL must be set when the database store is selected")
            })?;

            let mut options = ConnectOptions::new(db_url);
            options
                .max_connections(config.db_max_connections)
                .min_connections(config.db_min_connections)
                .max_lifetime(Duration::from_secs(config.db_max_lifetime_secs))
                .sqlx_logging(config.db_log_queries);

            let db = Database::connect(options).await?;
            migration::Migrator::up(&db, None).await?;
            tracing::info!("Database migrations applied successfully");

            Ok(Arc::new(DbTaskStore::new(db)))
        }
    }
}

/// Returns a copy of `task` with `children` filled from `all`.
fn with_children(task: &Task, all: &[Task]) -> Task {
    let mut task = task.clone();
    task.children = all
        .iter()
        .filter(|candidate| candidate.parent_id.as_deref() == Some(task.id.as_str()))
        .cloned()
        .collect();
    task
}
