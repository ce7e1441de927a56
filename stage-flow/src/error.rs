use thiserror::Error;

/// Errors produced while building or executing a pipeline.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("context error: {0}")]
    ContextError(String),

    #[error("task execution failed: {0}")]
    TaskExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
