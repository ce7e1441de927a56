use stage_flow::{Context, FlowRunner, Graph, GraphBuilder, Session, SessionStorage};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{StructureAnalysis, SubjectInfo};
use crate::ocr::OcrClient;
use crate::tasks::{
    AnalyzeTask, CalibrateTask, ExtractTask, GenerateTask, session_keys, task_ids,
};

/// The four-stage pipeline. Strictly linear; the only conditional edge keeps
/// calibration closed while the analysis verdict is incompatible.
pub fn build_pipeline(ocr: OcrClient) -> Graph {
    GraphBuilder::new("question_paper_pipeline")
        .add_task(Arc::new(ExtractTask::new(ocr)))
        .add_task(Arc::new(AnalyzeTask))
        .add_task(Arc::new(CalibrateTask))
        .add_task(Arc::new(GenerateTask))
        .add_edge(task_ids::EXTRACT, task_ids::ANALYZE)
        .add_conditional_edge(task_ids::ANALYZE, task_ids::CALIBRATE, analysis_is_compatible)
        .add_edge(task_ids::CALIBRATE, task_ids::GENERATE)
        .build()
}

fn analysis_is_compatible(context: &Context) -> bool {
    context
        .get_sync::<StructureAnalysis>(session_keys::STRUCTURE_ANALYSIS)
        .map(|analysis| analysis.are_compatible)
        .unwrap_or(false)
}

/// Fresh session positioned at the extraction stage, with the operator's
/// subject details in context.
pub async fn create_pipeline_session(subject: SubjectInfo) -> Session {
    let session = Session::new_from_task(Uuid::new_v4().to_string(), task_ids::EXTRACT);
    session.context.set(session_keys::SUBJECT_INFO, subject).await;
    session
}

pub fn create_flow_runner(ocr: OcrClient, session_storage: Arc<dyn SessionStorage>) -> FlowRunner {
    let graph = Arc::new(build_pipeline(ocr));
    FlowRunner::new(graph, session_storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{compatible_analysis, incompatible_analysis, subject_info};
    use std::time::Duration;

    fn pipeline() -> Graph {
        build_pipeline(OcrClient::new(
            "http://localhost:9/extract",
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn session_starts_at_extraction() {
        let session = create_pipeline_session(subject_info()).await;
        assert_eq!(session.current_task_id, task_ids::EXTRACT);
        let stored: crate::models::SubjectInfo =
            session.context.get(session_keys::SUBJECT_INFO).await.unwrap();
        assert_eq!(stored.subject_code, "CSE201");
    }

    #[tokio::test]
    async fn calibration_edge_stays_closed_for_incompatible_analysis() {
        let graph = pipeline();
        let context = Context::new();
        context
            .set(session_keys::STRUCTURE_ANALYSIS, incompatible_analysis())
            .await;
        assert_eq!(graph.find_next_task(task_ids::ANALYZE, &context), None);
    }

    #[tokio::test]
    async fn calibration_edge_opens_for_compatible_analysis() {
        let graph = pipeline();
        let context = Context::new();
        context
            .set(session_keys::STRUCTURE_ANALYSIS, compatible_analysis())
            .await;
        assert_eq!(
            graph.find_next_task(task_ids::ANALYZE, &context),
            Some(task_ids::CALIBRATE.to_string())
        );
    }

    #[tokio::test]
    async fn linear_edges_connect_the_remaining_stages() {
        let graph = pipeline();
        let context = Context::new();
        assert_eq!(
            graph.find_next_task(task_ids::EXTRACT, &context),
            Some(task_ids::ANALYZE.to_string())
        );
        assert_eq!(
            graph.find_next_task(task_ids::CALIBRATE, &context),
            Some(task_ids::GENERATE.to_string())
        );
        assert_eq!(graph.find_next_task(task_ids::GENERATE, &context), None);
    }
}
