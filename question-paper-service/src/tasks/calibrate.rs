use async_trait::async_trait;
use stage_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use tracing::info;

use crate::models::{CalibratedStructure, CalibrationForm, StructureAnalysis};
use crate::tasks::{session_keys, task_ids};
use crate::validate;

/// Human-in-the-loop calibration.
///
/// Without a submitted form this task publishes editable defaults derived
/// from the analysis and waits. With one, it stores the operator's literal
/// values as the calibrated structure; percentage splits that do not sum to
/// 100 produce warnings but never block the submission.
pub struct CalibrateTask;

#[async_trait]
impl Task for CalibrateTask {
    fn id(&self) -> &str {
        task_ids::CALIBRATE
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let analysis: StructureAnalysis = context
            .get(session_keys::STRUCTURE_ANALYSIS)
            .await
            .ok_or_else(|| {
                FlowError::ContextError("structure analysis not found - run analysis first".to_string())
            })?;

        if !analysis.are_compatible {
            return Err(FlowError::TaskExecutionFailed(format!(
                "cannot calibrate incompatible papers: {}",
                analysis.compatibility_reason
            )));
        }

        let form: Option<CalibrationForm> = context.get(session_keys::CALIBRATION_FORM).await;
        let Some(form) = form else {
            let defaults = CalibrationForm::prefilled_from(&analysis);
            context
                .set(session_keys::CALIBRATION_DEFAULTS, &defaults)
                .await;
            return Ok(TaskResult::new_with_status(
                Some("calibration defaults ready for review".to_string()),
                NextAction::WaitForInput,
                Some("waiting for operator calibration".to_string()),
            ));
        };

        if !(1..=10).contains(&form.num_papers) {
            return Err(FlowError::TaskExecutionFailed(format!(
                "papers to generate must be between 1 and 10, got {}",
                form.num_papers
            )));
        }

        let warnings = validate::distribution_warnings(&form);
        let calibrated = CalibratedStructure::from_form(form, &analysis);

        info!(
            sections = calibrated.sections.len(),
            num_papers = calibrated.generation_params.num_papers,
            warnings = warnings.len(),
            "calibration confirmed"
        );

        context
            .set(session_keys::CALIBRATED_STRUCTURE, &calibrated)
            .await;
        context
            .set(session_keys::CALIBRATION_WARNINGS, &warnings)
            .await;

        let response = if warnings.is_empty() {
            "calibration confirmed - ready to generate".to_string()
        } else {
            format!(
                "calibration confirmed with warnings:\n{}",
                warnings.join("\n")
            )
        };

        Ok(TaskResult::new_with_status(
            Some(response),
            NextAction::Continue,
            Some("calibration confirmed".to_string()),
        ))
    }
}
