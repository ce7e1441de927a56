pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod storage;
pub mod task;

// Re-export commonly used types
pub use context::Context;
pub use error::{FlowError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use runner::FlowRunner;
pub use storage::{
    GraphStorage, InMemoryGraphStorage, InMemorySessionStorage, Session, SessionStorage,
};
pub use task::{NextAction, Task, TaskResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct EchoTask {
        id: String,
    }

    #[async_trait]
    impl Task for EchoTask {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            let input: String = context.get("input").await.unwrap_or_default();
            context.set("output", format!("Processed: {}", input)).await;

            Ok(TaskResult::new(
                Some("Task completed".to_string()),
                NextAction::End,
            ))
        }
    }

    struct StepTask {
        id: String,
        next_action: NextAction,
    }

    #[async_trait]
    impl Task for StepTask {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            let count: u32 = context.get(&format!("ran_{}", self.id)).await.unwrap_or(0);
            context.set(format!("ran_{}", self.id), count + 1).await;

            Ok(TaskResult::new_with_status(
                None,
                self.next_action.clone(),
                Some(format!("{} done", self.id)),
            ))
        }
    }

    #[tokio::test]
    async fn test_simple_graph_execution() {
        let task = Arc::new(EchoTask {
            id: "echo".to_string(),
        });

        let graph = GraphBuilder::new("test_graph").add_task(task).build();

        let context = Context::new();
        context.set("input", "Hello, World!").await;

        let result = graph.execute("echo", context.clone()).await.unwrap();

        assert!(result.response.is_some());
        assert!(matches!(result.next_action, NextAction::End));

        let output: String = context.get("output").await.unwrap();
        assert_eq!(output, "Processed: Hello, World!");
    }

    #[tokio::test]
    async fn test_session_advances_one_step_per_call() {
        let first = Arc::new(StepTask {
            id: "first".to_string(),
            next_action: NextAction::Continue,
        });
        let second = Arc::new(StepTask {
            id: "second".to_string(),
            next_action: NextAction::End,
        });

        let graph = GraphBuilder::new("stepping")
            .add_task(first)
            .add_task(second)
            .add_edge("first", "second")
            .build();

        let mut session = Session::new_from_task("s1".to_string(), "first");

        let result = graph.execute_session(&mut session).await.unwrap();
        assert!(matches!(result.status, ExecutionStatus::WaitingForInput));
        assert_eq!(session.current_task_id, "second");
        assert_eq!(session.status_message.as_deref(), Some("first done"));
        // Second task has not run yet
        assert_eq!(session.context.get_sync::<u32>("ran_second"), None);

        let result = graph.execute_session(&mut session).await.unwrap();
        assert!(matches!(result.status, ExecutionStatus::Completed));
        assert_eq!(session.context.get_sync::<u32>("ran_second"), Some(1));
    }

    #[tokio::test]
    async fn test_conditional_edge_blocks_until_flag_set() {
        let gate = Arc::new(StepTask {
            id: "gate".to_string(),
            next_action: NextAction::Continue,
        });
        let target = Arc::new(StepTask {
            id: "target".to_string(),
            next_action: NextAction::End,
        });

        let graph = GraphBuilder::new("gated")
            .add_task(gate)
            .add_task(target)
            .add_conditional_edge("gate", "target", |ctx: &Context| {
                ctx.get_sync::<bool>("open").unwrap_or(false)
            })
            .build();

        let mut session = Session::new_from_task("s2".to_string(), "gate");

        // Condition false: the session stays at the gate task
        graph.execute_session(&mut session).await.unwrap();
        assert_eq!(session.current_task_id, "gate");

        session.context.set("open", true).await;
        graph.execute_session(&mut session).await.unwrap();
        assert_eq!(session.current_task_id, "target");
    }

    #[tokio::test]
    async fn test_wait_for_input_stays_put() {
        let waiting = Arc::new(StepTask {
            id: "waiting".to_string(),
            next_action: NextAction::WaitForInput,
        });
        let after = Arc::new(StepTask {
            id: "after".to_string(),
            next_action: NextAction::End,
        });

        let graph = GraphBuilder::new("waiting_graph")
            .add_task(waiting)
            .add_task(after)
            .add_edge("waiting", "after")
            .build();

        let mut session = Session::new_from_task("s3".to_string(), "waiting");

        for _ in 0..2 {
            let result = graph.execute_session(&mut session).await.unwrap();
            assert!(matches!(result.status, ExecutionStatus::WaitingForInput));
            assert_eq!(session.current_task_id, "waiting");
        }
        assert_eq!(session.context.get_sync::<u32>("ran_waiting"), Some(2));
    }

    #[tokio::test]
    async fn test_storage() {
        let graph_storage = InMemoryGraphStorage::new();
        let session_storage = InMemorySessionStorage::new();

        let graph = Arc::new(Graph::new("test"));
        graph_storage
            .save("test".to_string(), graph.clone())
            .await
            .unwrap();

        let retrieved = graph_storage.get("test").await.unwrap();
        assert!(retrieved.is_some());

        let session = Session::new_from_task("session1".to_string(), "task1");
        session_storage.save(session.clone()).await.unwrap();
        let retrieved_session = session_storage.get("session1").await.unwrap();
        assert!(retrieved_session.is_some());
    }

    #[tokio::test]
    async fn test_runner_does_not_advance_on_task_error() {
        struct FailingTask;

        #[async_trait]
        impl Task for FailingTask {
            fn id(&self) -> &str {
                "failing"
            }

            async fn run(&self, _context: Context) -> Result<TaskResult> {
                Err(FlowError::TaskExecutionFailed("boom".to_string()))
            }
        }

        let graph = Arc::new(
            GraphBuilder::new("failing_graph")
                .add_task(Arc::new(FailingTask))
                .build(),
        );
        let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        storage
            .save(Session::new_from_task("s4".to_string(), "failing"))
            .await
            .unwrap();

        let runner = FlowRunner::new(graph, storage.clone());
        assert!(runner.run("s4").await.is_err());

        let session = storage.get("s4").await.unwrap().unwrap();
        assert_eq!(session.current_task_id, "failing");
    }
}
