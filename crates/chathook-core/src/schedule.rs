// Scheduled-task snapshot source
//
// The scheduling engine itself is an external collaborator. The
// streamer only needs a point-in-time snapshot of what is scheduled so
// it can describe it in the system prompt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// One scheduled task, as described to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ScheduledTask {
    pub id: Uuid,
    /// Human-readable description of what the task does
    pub description: String,
    /// Next execution time, when known
    pub next_run: Option<DateTime<Utc>>,
}

impl ScheduledTask {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            description: description.into(),
            next_run: None,
        }
    }

    pub fn with_next_run(mut self, next_run: DateTime<Utc>) -> Self {
        self.next_run = Some(next_run);
        self
    }
}

/// Source of the scheduled-task snapshot used in prompt assembly
#[async_trait]
pub trait TaskSchedule: Send + Sync {
    /// Currently scheduled tasks as of call time
    async fn snapshot(&self) -> Vec<ScheduledTask>;
}

/// A schedule with nothing in it
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSchedule;

#[async_trait]
impl TaskSchedule for NoSchedule {
    async fn snapshot(&self) -> Vec<ScheduledTask> {
        Vec::new()
    }
}

/// In-memory schedule, fed by the task endpoints
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskSchedule {
    tasks: Arc<RwLock<Vec<ScheduledTask>>>,
}

impl InMemoryTaskSchedule {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a task to the schedule
    pub async fn add(&self, task: ScheduledTask) {
        self.tasks.write().await.push(task);
    }

    /// Remove a task by id
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        tasks.len() < before
    }
}

#[async_trait]
impl TaskSchedule for InMemoryTaskSchedule {
    async fn snapshot(&self) -> Vec<ScheduledTask> {
        self.tasks.read().await.clone()
    }
}

/// Render the dynamic scheduled-tasks block appended to the system prompt
pub fn describe_schedule(tasks: &[ScheduledTask]) -> String {
    if tasks.is_empty() {
        return String::new();
    }

    let mut block = String::from("\n\nCurrently scheduled tasks:\n");
    for task in tasks {
        match task.next_run {
            Some(next_run) => {
                block.push_str(&format!(
                    "- {} (next run: {})\n",
                    task.description,
                    next_run.to_rfc3339()
                ));
            }
            None => {
                block.push_str(&format!("- {}\n", task.description));
            }
        }
    }
    block
}
