use std::sync::Arc;

use crate::task::Priority;
use crate::task::api::v1::{
    self as tasks_v1, CreateTaskRequest, PatchTaskRequest, TaskJson, TaskState,
};

use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

/// JSON body returned by every failing API call.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Short human-readable summary
    pub error: String,
    /// Optional detail about what went wrong
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            error: error.into(),
            message,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Advisor Task API",
        version = "1.0",
        description = "REST API for managing tasks with reminders"
    ),
    paths(
        tasks_v1::list_tasks_handler,
        tasks_v1::create_task_handler,
        tasks_v1::list_due_tasks_handler,
        tasks_v1::get_task_handler,
        tasks_v1::patch_task_handler,
        tasks_v1::delete_task_handler,
        tasks_v1::complete_task_handler,
        tasks_v1::list_subtasks_handler,
    ),
    components(schemas(TaskJson, CreateTaskRequest, PatchTaskRequest, ErrorResponse, Priority)),
    tags((name = "Tasks", description = "Task management endpoints"))
)]
pub struct ApiDoc;

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(task_state: Arc<TaskState>) -> Router {
    let tasks_router = tasks_v1::create_api_router(task_state);
    Router::new().nest("/api/v1", tasks_router)
}
