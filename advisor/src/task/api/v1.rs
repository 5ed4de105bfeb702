use crate::task::{
    NewTask, Priority, PriorityError, Task, TaskChanges, TaskService, TaskServiceError,
};
use crate::web::api::ErrorResponse;
use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct TaskState {
    pub service: TaskService,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskJson {
    /// Unique identifier of the task
    id: String,
    /// Short title, never empty
    title: String,
    /// Free-form description
    description: String,
    /// Urgency of the task
    priority: Priority,
    /// When the task becomes due
    reminder_at: Option<DateTime<Utc>>,
    /// Whether the task is completed
    done: bool,
    /// Identifier of the parent task, if any
    parent_id: Option<String>,
    /// Direct subtasks
    #[schema(no_recursion)]
    children: Vec<TaskJson>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id().to_string(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            priority: task.priority(),
            reminder_at: task.reminder_at(),
            done: task.is_done(),
            parent_id: task.parent_id().map(str::to_string),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
            children: task.into_children().into_iter().map(TaskJson::from).collect(),
        }
    }
}

/// Request body for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[schema(example = "Pay rent")]
    title: String,
    #[serde(default)]
    description: String,
    /// One of low, medium, high
    #[serde(default)]
    #[schema(example = "high")]
    priority: String,
    #[serde(default)]
    reminder_at: Option<DateTime<Utc>>,
    /// Optional parent; must reference an existing task
    #[serde(default)]
    parent_id: Option<String>,
}

/// Request body for a partial update. Only the fields present are changed.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PatchTaskRequest {
    title: Option<String>,
    description: Option<String>,
    /// One of low, medium, high
    priority: Option<String>,
    reminder_at: Option<DateTime<Utc>>,
    done: Option<bool>,
    parent_id: Option<String>,
}

impl PatchTaskRequest {
    fn into_changes(self) -> Result<TaskChanges, PriorityError> {
        Ok(TaskChanges {
            priority: self.priority.as_deref().map(str::parse::<Priority>).transpose()?,
            title: self.title,
            description: self.description,
            reminder_at: self.reminder_at,
            done: self.done,
            parent_id: self.parent_id,
        })
    }
}

fn error_response(err: TaskServiceError) -> ApiError {
    let (status, error) = match &err {
        TaskServiceError::TaskNotFound(_) => (StatusCode::NOT_FOUND, "Task not found"),
        TaskServiceError::ParentNotFound(_) => (StatusCode::NOT_FOUND, "Parent task not found"),
        TaskServiceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input"),
        TaskServiceError::InvalidPriority(_) => (StatusCode::BAD_REQUEST, "Invalid priority"),
        TaskServiceError::Store(_) => {
            tracing::error!("Task storage failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    };
    (
        status,
        Json(ErrorResponse::new(error, Some(err.to_string()))),
    )
}

fn bad_request(error: &str, message: Option<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(error, message)),
    )
}

fn rejection_response(rejection: JsonRejection) -> ApiError {
    bad_request("Invalid JSON", Some(rejection.body_text()))
}

/// Handler for GET /api/v1/tasks - Returns every task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = [TaskJson]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let tasks = state.service.list().await.map_err(error_response)?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for POST /api/v1/tasks - Creates a task.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Malformed JSON, missing title or invalid priority", body = ErrorResponse),
        (status = 404, description = "Parent task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskJson>), ApiError> {
    let Json(request) = payload.map_err(rejection_response)?;

    if request.title.trim().is_empty() {
        return Err(bad_request("Title is required", None));
    }
    let priority: Priority = request
        .priority
        .parse()
        .map_err(|err: PriorityError| bad_request("Invalid priority", Some(err.to_string())))?;

    let new_task = NewTask::new(
        request.title,
        request.description,
        priority,
        request.reminder_at,
    );
    let created = match request.parent_id {
        Some(parent_id) => state.service.create_with_parent(new_task, parent_id).await,
        None => state.service.create(new_task).await,
    }
    .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(TaskJson::from(created))))
}

/// Handler for GET /api/v1/tasks/due - Returns the tasks whose reminder has passed.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/due",
    responses(
        (status = 200, description = "Tasks that are not done and past their reminder", body = [TaskJson]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_due_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let tasks = state.service.get_due().await.map_err(error_response)?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /api/v1/tasks/{id} - Returns one task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskJson>, ApiError> {
    let task = state.service.get_by_id(&id).await.map_err(error_response)?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for PATCH /api/v1/tasks/{id} - Updates only the fields sent.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    request_body = PatchTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Malformed JSON, unknown field, empty body or invalid value", body = ErrorResponse),
        (status = 404, description = "Task or parent task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn patch_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
    payload: Result<Json<PatchTaskRequest>, JsonRejection>,
) -> Result<Json<TaskJson>, ApiError> {
    let Json(request) = payload.map_err(rejection_response)?;
    let changes = request
        .into_changes()
        .map_err(|err| bad_request("Invalid priority", Some(err.to_string())))?;
    if changes.is_empty() {
        return Err(bad_request("No fields to update", None));
    }

    let task = state
        .service
        .patch(&id, changes)
        .await
        .map_err(error_response)?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /api/v1/tasks/{id} - Removes a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task identifier")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(&id).await.map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for PATCH /api/v1/tasks/{id}/complete - Marks a task as done.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}/complete",
    params(("id" = String, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task marked as done", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn complete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskJson>, ApiError> {
    let task = state.service.complete(&id).await.map_err(error_response)?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for GET /api/v1/tasks/{id}/subtasks - Returns the direct children of a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}/subtasks",
    params(("id" = String, Path, description = "Parent task identifier")),
    responses(
        (status = 200, description = "Subtasks of the task", body = [TaskJson]),
        (status = 404, description = "Task not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_subtasks_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TaskJson>>, ApiError> {
    let subtasks = state
        .service
        .list_subtasks(&id)
        .await
        .map_err(error_response)?;
    Ok(Json(subtasks.into_iter().map(TaskJson::from).collect()))
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route("/tasks/due", get(list_due_tasks_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .patch(patch_task_handler)
                .delete(delete_task_handler),
        )
        .route("/tasks/{id}/complete", patch(complete_task_handler))
        .route("/tasks/{id}/subtasks", get(list_subtasks_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_reject_unknown_patch_fields() {
        let result = serde_json::from_str::<PatchTaskRequest>(r#"{"title":"x","colour":"red"}"#);

        assert!(result.is_err());
    }

    #[test]
    fn can_convert_patch_request_into_changes() {
        let request: PatchTaskRequest =
            serde_json::from_str(r#"{"priority":" Alta ","done":true}"#).unwrap();

        let changes = request.into_changes().unwrap();

        assert_eq!(changes.priority, Some(Priority::High));
        assert_eq!(changes.done, Some(true));
        assert!(changes.title.is_none());
    }

    #[test]
    fn empty_patch_request_has_no_changes() {
        let request: PatchTaskRequest = serde_json::from_str("{}").unwrap();

        assert!(request.into_changes().unwrap().is_empty());
    }

    #[test]
    fn maps_service_errors_to_status_codes() {
        let cases = [
            (TaskServiceError::TaskNotFound("a".into()), StatusCode::NOT_FOUND),
            (TaskServiceError::ParentNotFound("b".into()), StatusCode::NOT_FOUND),
            (TaskServiceError::InvalidInput("c".into()), StatusCode::BAD_REQUEST),
            (
                TaskServiceError::InvalidPriority(PriorityError::Invalid("d".into())),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            let (status, Json(body)) = error_response(err);
            assert_eq!(status, expected);
            assert!(body.message.is_some());
        }
    }
}
