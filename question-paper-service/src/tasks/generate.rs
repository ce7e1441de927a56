use async_trait::async_trait;
use stage_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use tracing::info;

use crate::models::{
    CalibratedStructure, GenerationRequest, PaperSetResult, QuestionBankResult,
};
use crate::tasks::{session_keys, task_ids};
use crate::{llm, prompts, validate};

/// Produces either a question bank or a complete paper set from the
/// calibrated structure, then verifies the model's structural guarantees.
///
/// The task stays at the generate stage afterwards so the operator can
/// produce the other artifact kind, or regenerate, without a reset.
pub struct GenerateTask;

#[async_trait]
impl Task for GenerateTask {
    fn id(&self) -> &str {
        task_ids::GENERATE
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let calibrated: CalibratedStructure = context
            .get(session_keys::CALIBRATED_STRUCTURE)
            .await
            .ok_or_else(|| {
                FlowError::ContextError(
                    "calibrated structure not found - confirm calibration first".to_string(),
                )
            })?;

        let request: Option<GenerationRequest> =
            context.get(session_keys::GENERATION_REQUEST).await;
        let Some(request) = request else {
            return Ok(TaskResult::new_with_status(
                Some("choose question bank or paper set generation".to_string()),
                NextAction::WaitForInput,
                Some("waiting for generation request".to_string()),
            ));
        };

        // The request is consumed whether or not generation succeeds; a retry
        // states its intent again.
        context.remove(session_keys::GENERATION_REQUEST).await;

        match request {
            GenerationRequest::QuestionBank {
                questions_per_section,
            } => {
                generate_question_bank(&context, &calibrated, questions_per_section).await
            }
            GenerationRequest::PaperSet { num_papers } => {
                let num_papers =
                    num_papers.unwrap_or(calibrated.generation_params.num_papers);
                generate_paper_set(&context, &calibrated, num_papers).await
            }
        }
    }
}

async fn generate_question_bank(
    context: &Context,
    calibrated: &CalibratedStructure,
    questions_per_section: u32,
) -> Result<TaskResult> {
    if !(10..=50).contains(&questions_per_section) {
        return Err(FlowError::TaskExecutionFailed(format!(
            "questions per section must be between 10 and 50, got {questions_per_section}"
        )));
    }

    info!(questions_per_section, "generating question bank");

    let user_prompt = prompts::question_bank_user(calibrated, questions_per_section);
    let bank: QuestionBankResult = llm::completion_json(
        prompts::QUESTION_BANK_SYSTEM,
        &user_prompt,
        llm::QUESTION_BANK,
    )
    .await
    .map_err(|e| FlowError::TaskExecutionFailed(e.to_string()))?;

    let warnings = validate::verify_question_bank(&bank, questions_per_section);
    let total: usize = bank.question_bank.values().map(Vec::len).sum();
    let sections = bank.question_bank.len();

    context.set(session_keys::QUESTION_BANK, &bank).await;
    context
        .set(session_keys::GENERATION_WARNINGS, &warnings)
        .await;

    let mut response = format!("question bank generated: {total} questions across {sections} sections");
    if !warnings.is_empty() {
        response.push_str(&format!("\nwarnings:\n{}", warnings.join("\n")));
    }

    Ok(TaskResult::new_with_status(
        Some(response),
        NextAction::WaitForInput,
        Some("question bank generated".to_string()),
    ))
}

async fn generate_paper_set(
    context: &Context,
    calibrated: &CalibratedStructure,
    num_papers: u32,
) -> Result<TaskResult> {
    if !(1..=10).contains(&num_papers) {
        return Err(FlowError::TaskExecutionFailed(format!(
            "papers to generate must be between 1 and 10, got {num_papers}"
        )));
    }

    let plan = validate::difficulty_plan(num_papers);
    info!(num_papers, "generating paper set");

    let user_prompt = prompts::paper_set_user(calibrated, num_papers, &plan);
    let set: PaperSetResult =
        llm::completion_json(prompts::PAPER_SET_SYSTEM, &user_prompt, llm::PAPER_SET)
            .await
            .map_err(|e| FlowError::TaskExecutionFailed(e.to_string()))?;

    let warnings = validate::verify_paper_set(&set, num_papers).map_err(|violation| {
        FlowError::TaskExecutionFailed(format!("generated paper set rejected: {violation}"))
    })?;

    context.set(session_keys::GENERATED_PAPERS, &set).await;
    context
        .set(session_keys::GENERATION_WARNINGS, &warnings)
        .await;

    let mut response = format!(
        "{num_papers} papers generated with difficulty progression {}",
        plan.iter()
            .map(|level| level.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    if !warnings.is_empty() {
        response.push_str(&format!("\nwarnings:\n{}", warnings.join("\n")));
    }

    Ok(TaskResult::new_with_status(
        Some(response),
        NextAction::WaitForInput,
        Some("paper set generated".to_string()),
    ))
}
