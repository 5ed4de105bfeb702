//! Task aggregate.
//!
//! A task is the single unit of work tracked by advisor. This module holds the
//! record itself, the payloads used to create and partially update it, and the
//! submodules that persist it, apply the business rules and expose it over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod api;
pub mod priority;
pub mod service;
pub mod store;

pub use priority::{Priority, PriorityError};
pub use service::{TaskService, TaskServiceError};

/// A tracked task.
///
/// `children` is derived by the store on every read and is never persisted;
/// a child only records its parent through `parent_id`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Task {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    priority: Priority,
    #[serde(default)]
    reminder_at: Option<DateTime<Utc>>,
    #[serde(default)]
    done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    #[serde(skip)]
    children: Vec<Task>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a not-yet-done task stamped with `now` for both timestamps.
    pub fn new(id: String, new_task: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new_task.title,
            description: new_task.description,
            priority: new_task.priority,
            reminder_at: new_task.reminder_at,
            done: false,
            parent_id: new_task.parent_id,
            children: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn reminder_at(&self) -> Option<DateTime<Utc>> {
        self.reminder_at
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// Returns the tasks whose `parent_id` is this task's id.
    pub fn children(&self) -> &[Task] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Task> {
        self.children
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// A task is due when it is not done and its reminder is at or before `now`.
    /// Tasks without a reminder are never due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.done && self.reminder_at.is_some_and(|reminder_at| reminder_at <= now)
    }

    /// Applies every field present in `changes` and stamps `updated_at`.
    pub(crate) fn apply(&mut self, changes: &TaskChanges, updated_at: DateTime<Utc>) {
        if let Some(title) = &changes.title {
            self.title = title.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(reminder_at) = changes.reminder_at {
            self.reminder_at = Some(reminder_at);
        }
        if let Some(done) = changes.done {
            self.done = done;
        }
        if let Some(parent_id) = &changes.parent_id {
            self.parent_id = Some(parent_id.clone());
        }
        self.updated_at = updated_at.max(self.created_at);
    }
}

/// User-supplied fields for a task that does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub reminder_at: Option<DateTime<Utc>>,
    pub parent_id: Option<String>,
}

impl NewTask {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        reminder_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
            reminder_at,
            parent_id: None,
        }
    }
}

/// Partial update of a task. Every `None` field is left untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub reminder_at: Option<DateTime<Utc>>,
    pub done: Option<bool>,
    pub parent_id: Option<String>,
}

impl TaskChanges {
    /// The change-set that marks a task as done.
    pub fn complete() -> Self {
        Self {
            done: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.reminder_at.is_none()
            && self.done.is_none()
            && self.parent_id.is_none()
    }
}
