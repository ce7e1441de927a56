use async_trait::async_trait;
use stage_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use tracing::info;

use crate::models::{PaperText, StructureAnalysis, SubjectInfo};
use crate::tasks::{session_keys, task_ids};
use crate::{llm, prompts};

/// Compares the two extracted papers against the syllabus and course
/// objectives and stores the structure analysis.
///
/// An incompatible verdict is a valid result: it is stored with its reason
/// and the conditional edge towards calibration simply never opens.
pub struct AnalyzeTask;

#[async_trait]
impl Task for AnalyzeTask {
    fn id(&self) -> &str {
        task_ids::ANALYZE
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let subject: SubjectInfo = context
            .get(session_keys::SUBJECT_INFO)
            .await
            .ok_or_else(|| FlowError::ContextError("subject info not found".to_string()))?;

        let papers: Vec<PaperText> = context
            .get(session_keys::PAPER_TEXTS)
            .await
            .ok_or_else(|| {
                FlowError::ContextError(
                    "no extracted papers - run text extraction first".to_string(),
                )
            })?;

        let usable: Vec<&PaperText> = papers
            .iter()
            .filter(|paper| !paper.extracted_text.trim().is_empty())
            .collect();
        let [paper1, paper2] = usable.as_slice() else {
            return Err(FlowError::TaskExecutionFailed(format!(
                "structure analysis needs exactly 2 papers with extracted text, got {}",
                usable.len()
            )));
        };

        info!(paper1 = %paper1.filename, paper2 = %paper2.filename, "analyzing paper structure");

        let user_prompt = prompts::structure_analysis_user(&subject, paper1, paper2);
        let analysis: StructureAnalysis = llm::completion_json(
            prompts::STRUCTURE_ANALYSIS_SYSTEM,
            &user_prompt,
            llm::STRUCTURE_ANALYSIS,
        )
        .await
        .map_err(|e| FlowError::TaskExecutionFailed(e.to_string()))?;

        // Re-running analysis resets calibration and generation to fresh
        // defaults; cleared only now that the new analysis exists.
        for key in [
            session_keys::CALIBRATION_DEFAULTS,
            session_keys::CALIBRATION_FORM,
            session_keys::CALIBRATED_STRUCTURE,
            session_keys::CALIBRATION_WARNINGS,
            session_keys::GENERATION_REQUEST,
            session_keys::QUESTION_BANK,
            session_keys::GENERATED_PAPERS,
            session_keys::GENERATION_WARNINGS,
        ] {
            context.remove(key).await;
        }

        let (response, status) = if analysis.are_compatible {
            (
                format!(
                    "papers are compatible (score {}%) - calibration is open",
                    analysis.compatibility_score
                ),
                "analysis completed, papers compatible".to_string(),
            )
        } else {
            (
                format!("papers are not compatible: {}", analysis.compatibility_reason),
                "analysis completed, papers not compatible".to_string(),
            )
        };

        context.set(session_keys::STRUCTURE_ANALYSIS, &analysis).await;

        // ContinueAndExecute so a compatible analysis immediately lands on the
        // calibration task, which publishes its editable defaults and waits.
        Ok(TaskResult::new_with_status(
            Some(response),
            NextAction::ContinueAndExecute,
            Some(status),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperText;
    use crate::test_fixtures::subject_info;
    use stage_flow::Context;

    fn paper(name: &str, text: &str) -> PaperText {
        PaperText {
            filename: name.to_string(),
            extracted_text: text.to_string(),
            text_length: text.len() as u64,
        }
    }

    #[tokio::test]
    async fn refuses_single_extracted_paper_and_reports_count() {
        let context = Context::new();
        context.set(session_keys::SUBJECT_INFO, subject_info()).await;
        context
            .set(
                session_keys::PAPER_TEXTS,
                vec![paper("only.pdf", "1a) Define a stack.")],
            )
            .await;

        let err = AnalyzeTask.run(context.clone()).await.unwrap_err();
        assert!(err.to_string().contains("got 1"));
        // Nothing was stored for the analysis stage
        assert!(!context.contains_key(session_keys::STRUCTURE_ANALYSIS));
    }

    #[tokio::test]
    async fn counts_only_papers_with_nonempty_text() {
        let context = Context::new();
        context.set(session_keys::SUBJECT_INFO, subject_info()).await;
        context
            .set(
                session_keys::PAPER_TEXTS,
                vec![
                    paper("good.pdf", "1a) Define a stack."),
                    paper("blank.pdf", "   "),
                ],
            )
            .await;

        let err = AnalyzeTask.run(context.clone()).await.unwrap_err();
        assert!(err.to_string().contains("got 1"));
    }

    #[tokio::test]
    async fn refuses_to_run_without_extraction_output() {
        let context = Context::new();
        context.set(session_keys::SUBJECT_INFO, subject_info()).await;

        let err = AnalyzeTask.run(context).await.unwrap_err();
        assert!(matches!(err, FlowError::ContextError(_)));
    }
}
