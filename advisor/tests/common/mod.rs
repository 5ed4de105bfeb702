#![allow(dead_code)]

use advisor::task::TaskService;
use advisor::task::store::{DbTaskStore, JsonFileStore};
use assert_fs::TempDir;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

/// Opens a private in-memory SQLite database with the schema applied.
///
/// The pool is pinned to one connection so every query sees the same
/// in-memory database.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_db_service() -> anyhow::Result<TaskService> {
    let db = setup_db().await?;
    Ok(TaskService::new(Arc::new(DbTaskStore::new(db))))
}

/// Test context for services backed by a JSON file.
pub struct JsonContext {
    #[allow(dead_code)] // directory is kept so the task file is not removed
    pub dir: TempDir,
    pub service: TaskService,
}

pub fn setup_json_service() -> anyhow::Result<JsonContext> {
    let dir = TempDir::new()?;
    let store = JsonFileStore::new(dir.path().join("tasks.json"));
    Ok(JsonContext {
        service: TaskService::new(Arc::new(store)),
        dir,
    })
}
