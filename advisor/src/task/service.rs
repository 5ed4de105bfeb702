use crate::task::store::{StoreError, TaskStore};
use crate::task::{NewTask, PriorityError, Task, TaskChanges};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// The task being read or changed does not exist.
    #[error("Task {0} not found")]
    TaskNotFound(String),
    /// The task referenced as a parent does not exist.
    #[error("Parent task {0} not found")]
    ParentNotFound(String),
    /// The request is well-formed but breaks a task rule.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    InvalidPriority(#[from] PriorityError),
    /// The backing store failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Business rules for tasks, on top of any [`TaskStore`].
///
/// The service holds no locks of its own; it is as safe to share between
/// requests as the store it wraps.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Retrieves every task in store order.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.store.list().await?)
    }

    /// Retrieves a task by its ID.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` when no task has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_by_id(&self, id: &str) -> Result<Task, TaskServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))
    }

    /// Creates a new task.
    ///
    /// The task starts not done, with `created_at == updated_at`. When
    /// `new_task.parent_id` is set the parent is validated the same way as in
    /// [`TaskService::create_with_parent`].
    ///
    /// # Returns
    ///
    /// The task as read back from the store.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, new_task: NewTask) -> Result<Task, TaskServiceError> {
        if new_task.title.trim().is_empty() {
            return Err(TaskServiceError::InvalidInput(
                "title is required".to_string(),
            ));
        }
        if let Some(parent_id) = &new_task.parent_id {
            self.ensure_valid_parent(None, parent_id).await?;
        }

        let task = Task::new(Uuid::new_v4().to_string(), new_task, Utc::now());
        self.store.create(&task).await?;
        tracing::info!("Created task {}", task.id());

        self.get_by_id(task.id()).await
    }

    /// Creates a new task under an existing parent.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `parent_id` is empty, `ParentNotFound` when it does
    /// not reference an existing task.
    #[tracing::instrument(skip(self))]
    pub async fn create_with_parent(
        &self,
        new_task: NewTask,
        parent_id: String,
    ) -> Result<Task, TaskServiceError> {
        self.create(NewTask {
            parent_id: Some(parent_id),
            ..new_task
        })
        .await
    }

    /// Applies a partial update to a task.
    ///
    /// An empty change-set is rejected before the store is touched. A new
    /// `parent_id` must be non-empty, must differ from `id` and must reference
    /// an existing task.
    #[tracing::instrument(skip(self))]
    pub async fn patch(&self, id: &str, changes: TaskChanges) -> Result<Task, TaskServiceError> {
        if changes.is_empty() {
            return Err(TaskServiceError::InvalidInput(
                "no fields to update".to_string(),
            ));
        }
        if changes
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(TaskServiceError::InvalidInput(
                "title must not be empty".to_string(),
            ));
        }
        if let Some(parent_id) = &changes.parent_id {
            self.ensure_valid_parent(Some(id), parent_id).await?;
        }

        self.store
            .patch(id, &changes, Utc::now())
            .await?
            .ok_or_else(|| TaskServiceError::TaskNotFound(id.to_string()))
    }

    /// Marks a task as done. Completing a done task is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, id: &str) -> Result<Task, TaskServiceError> {
        self.patch(id, TaskChanges::complete()).await
    }

    /// Deletes a task by its ID. Its children are detached, not deleted.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), TaskServiceError> {
        if !self.store.delete(id).await? {
            return Err(TaskServiceError::TaskNotFound(id.to_string()));
        }
        tracing::info!("Deleted task {}", id);
        Ok(())
    }

    /// Retrieves the direct children of a task. Never absent, possibly empty.
    #[tracing::instrument(skip(self))]
    pub async fn list_subtasks(&self, parent_id: &str) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self.get_by_id(parent_id).await?.into_children())
    }

    /// Retrieves the tasks that are due right now.
    pub async fn get_due(&self) -> Result<Vec<Task>, TaskServiceError> {
        self.get_due_at(Utc::now()).await
    }

    /// Retrieves the tasks that are not done and whose reminder is at or
    /// before `now`, in store order. Tasks without a reminder are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn get_due_at(&self, now: DateTime<Utc>) -> Result<Vec<Task>, TaskServiceError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|task| task.is_due(now))
            .collect())
    }

    async fn ensure_valid_parent(
        &self,
        task_id: Option<&str>,
        parent_id: &str,
    ) -> Result<(), TaskServiceError> {
        if parent_id.trim().is_empty() {
            return Err(TaskServiceError::InvalidInput(
                "parent_id must not be empty".to_string(),
            ));
        }
        if task_id == Some(parent_id) {
            return Err(TaskServiceError::InvalidInput(
                "a task cannot be its own parent".to_string(),
            ));
        }
        if self.store.get_by_id(parent_id).await?.is_none() {
            return Err(TaskServiceError::ParentNotFound(parent_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use crate::task::store::MockTaskStore;
    use chrono::TimeZone;

    fn stored_task(id: &str, parent_id: Option<&str>) -> Task {
        let mut new_task = NewTask::new("Stored", "", Priority::Low, None);
        new_task.parent_id = parent_id.map(str::to_string);
        Task::new(id.to_string(), new_task, Utc::now())
    }

    fn service_with(store: MockTaskStore) -> TaskService {
        TaskService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn rejects_empty_title_without_persisting() {
        let mut store = MockTaskStore::new();
        store.expect_create().never();

        let result = service_with(store)
            .create(NewTask::new("   ", "", Priority::Low, None))
            .await;

        assert!(matches!(result, Err(TaskServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn can_create_task_and_read_it_back() {
        let mut store = MockTaskStore::new();
        store
            .expect_create()
            .withf(|task| task.title() == "Pay rent" && !task.is_done())
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_get_by_id()
            .times(1)
            .returning(|id| Ok(Some(stored_task(id, None))));

        let created = service_with(store)
            .create(NewTask::new("Pay rent", "", Priority::High, None))
            .await
            .expect("Failed to create task");

        assert!(!created.is_done());
    }

    #[tokio::test]
    async fn rejects_empty_parent_id_on_create() {
        let mut store = MockTaskStore::new();
        store.expect_get_by_id().never();
        store.expect_create().never();

        let result = service_with(store)
            .create_with_parent(
                NewTask::new("Child", "", Priority::Low, None),
                String::new(),
            )
            .await;

        assert!(matches!(result, Err(TaskServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn reports_missing_parent_on_create() {
        let mut store = MockTaskStore::new();
        store
            .expect_get_by_id()
            .withf(|id| id == "missing")
            .returning(|_| Ok(None));
        store.expect_create().never();

        let result = service_with(store)
            .create_with_parent(
                NewTask::new("Child", "", Priority::Low, None),
                "missing".to_string(),
            )
            .await;

        assert!(
            matches!(result, Err(TaskServiceError::ParentNotFound(ref id)) if id == "missing")
        );
    }

    #[tokio::test]
    async fn rejects_empty_change_set_before_reaching_store() {
        let mut store = MockTaskStore::new();
        store.expect_patch().never();

        let result = service_with(store)
            .patch("task-1", TaskChanges::default())
            .await;

        assert!(matches!(result, Err(TaskServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn rejects_self_parenting_even_for_unknown_task() {
        let mut store = MockTaskStore::new();
        store.expect_get_by_id().never();
        store.expect_patch().never();

        let changes = TaskChanges {
            parent_id: Some("ghost".to_string()),
            ..Default::default()
        };
        let result = service_with(store).patch("ghost", changes).await;

        assert!(matches!(result, Err(TaskServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn reports_parent_not_found_instead_of_task_not_found() {
        let mut store = MockTaskStore::new();
        store.expect_get_by_id().returning(|_| Ok(None));
        store.expect_patch().never();

        let changes = TaskChanges {
            parent_id: Some("missing-parent".to_string()),
            ..Default::default()
        };
        let result = service_with(store).patch("task-1", changes).await;

        assert!(matches!(result, Err(TaskServiceError::ParentNotFound(_))));
    }

    #[tokio::test]
    async fn can_patch_parent_when_it_exists() {
        let mut store = MockTaskStore::new();
        store
            .expect_get_by_id()
            .withf(|id| id == "parent")
            .returning(|id| Ok(Some(stored_task(id, None))));
        store
            .expect_patch()
            .withf(|id, changes, _| id == "child" && changes.parent_id.as_deref() == Some("parent"))
            .times(1)
            .returning(|id, _, _| Ok(Some(stored_task(id, Some("parent")))));

        let changes = TaskChanges {
            parent_id: Some("parent".to_string()),
            ..Default::default()
        };
        let patched = service_with(store)
            .patch("child", changes)
            .await
            .expect("Failed to patch task");

        assert_eq!(patched.parent_id(), Some("parent"));
    }

    #[tokio::test]
    async fn maps_unpatched_task_to_not_found() {
        let mut store = MockTaskStore::new();
        store.expect_patch().returning(|_, _, _| Ok(None));

        let result = service_with(store).complete("missing").await;

        assert!(matches!(result, Err(TaskServiceError::TaskNotFound(ref id)) if id == "missing"));
    }

    #[tokio::test]
    async fn complete_is_a_done_patch() {
        let mut store = MockTaskStore::new();
        store
            .expect_patch()
            .withf(|_, changes, _| *changes == TaskChanges::complete())
            .times(2)
            .returning(|id, changes, updated_at| {
                let mut task = stored_task(id, None);
                task.apply(changes, updated_at);
                Ok(Some(task))
            });
        let service = service_with(store);

        let first = service.complete("task-1").await.expect("first completion");
        let second = service.complete("task-1").await.expect("second completion");

        assert!(first.is_done());
        assert!(second.is_done());
    }

    #[tokio::test]
    async fn maps_missing_delete_to_not_found() {
        let mut store = MockTaskStore::new();
        store.expect_delete().returning(|_| Ok(false));

        let result = service_with(store).delete("missing").await;

        assert!(matches!(result, Err(TaskServiceError::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn subtasks_of_childless_task_are_empty() {
        let mut store = MockTaskStore::new();
        store
            .expect_get_by_id()
            .returning(|id| Ok(Some(stored_task(id, None))));

        let subtasks = service_with(store)
            .list_subtasks("task-1")
            .await
            .expect("Failed to list subtasks");

        assert!(subtasks.is_empty());
    }

    #[tokio::test]
    async fn subtasks_of_missing_task_is_not_found() {
        let mut store = MockTaskStore::new();
        store.expect_get_by_id().returning(|_| Ok(None));

        let result = service_with(store).list_subtasks("missing").await;

        assert!(matches!(result, Err(TaskServiceError::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn can_filter_due_tasks_in_store_order() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let mut store = MockTaskStore::new();
        store.expect_list().returning(move || {
            let past = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
            let future = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
            let mut done = Task::new(
                "done".to_string(),
                NewTask::new("Done", "", Priority::Low, Some(past)),
                past,
            );
            done.apply(&TaskChanges::complete(), past);
            Ok(vec![
                Task::new(
                    "second".to_string(),
                    NewTask::new("Second", "", Priority::Low, Some(past)),
                    past,
                ),
                Task::new(
                    "no-reminder".to_string(),
                    NewTask::new("No reminder", "", Priority::Low, None),
                    past,
                ),
                done,
                Task::new(
                    "future".to_string(),
                    NewTask::new("Future", "", Priority::Low, Some(future)),
                    past,
                ),
                Task::new(
                    "first".to_string(),
                    NewTask::new("First", "", Priority::Low, Some(now)),
                    past,
                ),
            ])
        });

        let due = service_with(store)
            .get_due_at(now)
            .await
            .expect("Failed to get due tasks");

        let ids: Vec<&str> = due.iter().map(Task::id).collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn surfaces_store_failures() {
        let mut store = MockTaskStore::new();
        store
            .expect_list()
            .returning(|| Err(StoreError::Io(std::io::Error::other("disk on fire"))));

        let result = service_with(store).list().await;

        assert!(matches!(result, Err(TaskServiceError::Store(_))));
    }
}
