use super::{StoreError, TaskStore, with_children};
use crate::task::{Task, TaskChanges};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Stores the whole task collection as one JSON array in one file.
///
/// Every operation loads the full file and, when mutating, rewrites it. The
/// load/mutate/save cycle runs under a single lock, so at most one operation
/// touches the file at a time.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Reads the collection. A missing or blank file is an empty collection.
    async fn load(&self) -> Result<Vec<Task>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(|byte| byte.is_ascii_whitespace()) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    "Task file {} does not exist yet, starting empty",
                    self.path.display()
                );
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(tasks)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for JsonFileStore {
    #[tracing::instrument(skip(self, task), fields(id = task.id()))]
    async fn create(&self, task: &Task) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        let mut task = task.clone();
        task.children.clear();
        tasks.push(task);
        self.save(&tasks).await
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let _guard = self.lock.lock().await;
        let tasks = self.load().await?;
        Ok(tasks
            .iter()
            .find(|task| task.id == id)
            .map(|task| with_children(task, &tasks)))
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let _guard = self.lock.lock().await;
        let tasks = self.load().await?;
        Ok(tasks
            .iter()
            .map(|task| with_children(task, &tasks))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn patch(
        &self,
        id: &str,
        changes: &TaskChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Task>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        let Some(position) = tasks.iter().position(|task| task.id == id) else {
            return Ok(None);
        };

        tasks[position].apply(changes, updated_at);
        self.save(&tasks).await?;
        Ok(Some(with_children(&tasks[position], &tasks)))
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.load().await?;
        let Some(position) = tasks.iter().position(|task| task.id == id) else {
            return Ok(false);
        };

        tasks.remove(position);
        for child in tasks
            .iter_mut()
            .filter(|task| task.parent_id.as_deref() == Some(id))
        {
            child.parent_id = None;
        }
        self.save(&tasks).await?;
        Ok(true)
    }
}
