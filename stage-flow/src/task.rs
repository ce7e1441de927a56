use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{context::Context, error::Result};

/// Result of a task execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the task that produced this result; filled in by the graph
    pub task_id: String,
    /// Response to send to the operator
    pub response: Option<String>,
    /// Short progress message persisted on the session
    pub status_message: Option<String>,
    /// Next action to take
    pub next_action: NextAction,
}

impl TaskResult {
    pub fn new(response: Option<String>, next_action: NextAction) -> Self {
        Self {
            task_id: String::new(),
            response,
            status_message: None,
            next_action,
        }
    }

    pub fn new_with_status(
        response: Option<String>,
        next_action: NextAction,
        status_message: Option<String>,
    ) -> Self {
        Self {
            task_id: String::new(),
            response,
            status_message,
            next_action,
        }
    }
}

/// Defines what should happen after a task completes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NextAction {
    /// Advance to the next task along the edges, then pause for the next
    /// operator action
    Continue,
    /// Advance to the next task and execute it immediately
    ContinueAndExecute,
    /// Go to a specific task by id
    GoTo(String),
    /// Stay at the current task until more input arrives
    WaitForInput,
    /// End the pipeline execution
    End,
}

/// Core trait that all tasks must implement
#[async_trait]
pub trait Task: Send + Sync {
    /// Unique identifier for this task
    fn id(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Execute the task with the given context
    async fn run(&self, context: Context) -> Result<TaskResult>;
}
