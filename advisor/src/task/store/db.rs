use super::{StoreError, TaskStore, with_children};
use crate::entities::*;
use crate::task::{Priority, Task, TaskChanges};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;

/// Relational task store backed by sea-orm.
///
/// Deletion is soft: the row gets a `deleted_at` marker and disappears from
/// every read. Children of a deleted task are detached in the same
/// transaction, mirroring the `ON DELETE SET NULL` foreign key.
pub struct DbTaskStore {
    db: DatabaseConnection,
}

impl DbTaskStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Rows that have not been soft-deleted.
    fn live() -> Select<task::Entity> {
        task::Entity::find().filter(task::Column::DeletedAt.is_null())
    }
}

impl TryFrom<task::Model> for Task {
    type Error = StoreError;

    fn try_from(model: task::Model) -> Result<Self, Self::Error> {
        let priority = model
            .priority
            .parse::<Priority>()
            .map_err(|err| StoreError::Corrupted {
                id: model.id.clone(),
                reason: err.to_string(),
            })?;

        Ok(Task {
            id: model.id,
            title: model.title,
            description: model.description,
            priority,
            reminder_at: model.reminder_at,
            done: model.done,
            parent_id: model.parent_id,
            children: Vec::new(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[async_trait]
impl TaskStore for DbTaskStore {
    #[tracing::instrument(skip(self, task), fields(id = task.id()))]
    async fn create(&self, task: &Task) -> Result<(), StoreError> {
        let active_model = task::ActiveModel {
            id: ActiveValue::Set(task.id.clone()),
            title: ActiveValue::Set(task.title.clone()),
            description: ActiveValue::Set(task.description.clone()),
            priority: ActiveValue::Set(task.priority.as_str().to_string()),
            reminder_at: ActiveValue::Set(task.reminder_at),
            done: ActiveValue::Set(task.done),
            parent_id: ActiveValue::Set(task.parent_id.clone()),
            created_at: ActiveValue::Set(task.created_at),
            updated_at: ActiveValue::Set(task.updated_at),
            deleted_at: ActiveValue::Set(None),
        };
        task::Entity::insert(active_model)
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let Some(model) = Self::live()
            .filter(task::Column::Id.eq(id))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut found = Task::try_from(model)?;
        found.children = Self::live()
            .filter(task::Column::ParentId.eq(id))
            .order_by_asc(task::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(found))
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let tasks = Self::live()
            .order_by_desc(task::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;

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
        // updated_at never falls behind created_at, even if the clock stepped back
        let stamp = Expr::case(
            task::Column::CreatedAt.gt(updated_at),
            Expr::col(task::Column::CreatedAt),
        )
        .finally(Expr::value(updated_at));
        let mut update = task::Entity::update_many()
            .col_expr(task::Column::UpdatedAt, stamp.into())
            .filter(task::Column::Id.eq(id))
            .filter(task::Column::DeletedAt.is_null());

        if let Some(title) = &changes.title {
            update = update.col_expr(task::Column::Title, Expr::value(title.clone()));
        }
        if let Some(description) = &changes.description {
            update = update.col_expr(task::Column::Description, Expr::value(description.clone()));
        }
        if let Some(priority) = changes.priority {
            update = update.col_expr(task::Column::Priority, Expr::value(priority.as_str()));
        }
        if let Some(reminder_at) = changes.reminder_at {
            update = update.col_expr(task::Column::ReminderAt, Expr::value(reminder_at));
        }
        if let Some(done) = changes.done {
            update = update.col_expr(task::Column::Done, Expr::value(done));
        }
        if let Some(parent_id) = &changes.parent_id {
            update = update.col_expr(task::Column::ParentId, Expr::value(parent_id.clone()));
        }

        let result = update.exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let txn = self.db.begin().await?;

        let result = task::Entity::update_many()
            .col_expr(task::Column::DeletedAt, Expr::value(Some(Utc::now())))
            .filter(task::Column::Id.eq(id))
            .filter(task::Column::DeletedAt.is_null())
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        let detached = task::Entity::update_many()
            .col_expr(task::Column::ParentId, Expr::value(Option::<String>::None))
            .filter(task::Column::ParentId.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        tracing::debug!("Detached {} children of task {}", detached.rows_affected, id);
        Ok(true)
    }
}
