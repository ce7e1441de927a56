//! FlowRunner – convenience wrapper that loads a session, executes exactly
//! **one** graph step, and persists the updated session back to storage.
//!
//! Interactive services usually want to run one step per HTTP request, send
//! the reply back to the client, and have the session saved for the next
//! roundtrip; `FlowRunner` makes that a one-liner. Use
//! `Graph::execute_session` directly when you need custom persistence logic
//! or want to inspect the intermediate `Session` before saving.
//!
//! A task error propagates before the save, so a failed step never moves the
//! session pointer.

use std::sync::Arc;

use crate::{
    error::{FlowError, Result},
    graph::{ExecutionResult, Graph},
    storage::SessionStorage,
};

/// High-level helper that orchestrates the common _load → execute → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    graph: Arc<Graph>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    /// Create a new `FlowRunner` from an `Arc<Graph>` and any `SessionStorage` implementation.
    pub fn new(graph: Arc<Graph>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { graph, storage }
    }

    /// Execute **exactly one** task for the given `session_id` and persist the
    /// updated session.
    pub async fn run(&self, session_id: &str) -> Result<ExecutionResult> {
        let mut session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))?;

        let result = self.graph.execute_session(&mut session).await?;

        // Persist new state so the next call starts where we left off
        self.storage.save(session).await?;

        Ok(result)
    }
}
