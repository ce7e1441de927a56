use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use stage_flow::{
    ExecutionResult, ExecutionStatus, FlowError, FlowRunner, InMemorySessionStorage, Session,
    SessionStorage,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    CalibrationForm, GenerationRequest, StructureAnalysis, SubjectInfo, UploadedPaper,
};
use crate::ocr::OcrClient;
use crate::tasks::{session_keys, task_ids};
use crate::workflow::{create_flow_runner, create_pipeline_session};

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn conflict_error(message: &str) -> ApiError {
    (StatusCode::CONFLICT, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

/// Map a pipeline failure onto the HTTP surface. Stage execution failures are
/// upstream problems the operator can retry, so they come back as 502.
fn stage_error(error: FlowError) -> ApiError {
    match error {
        FlowError::TaskExecutionFailed(message) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "stage failed - previous results are untouched, retry when ready",
                "details": message
            })),
        ),
        FlowError::ContextError(message) => conflict_error(&message),
        FlowError::SessionNotFound(id) => not_found_error("Session not found", &id),
        other => internal_error("pipeline error", &other.to_string()),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub flow_runner: FlowRunner,
}

#[derive(Debug, Serialize)]
struct StageOutputs {
    extraction: bool,
    analysis: bool,
    calibration: bool,
    question_bank: bool,
    paper_set: bool,
}

#[derive(Debug, Serialize)]
struct SessionStatusResponse {
    session_id: String,
    current_stage: String,
    status_message: Option<String>,
    outputs: StageOutputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    compatibility: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calibration_defaults: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calibration_warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_warnings: Option<Vec<String>>,
}

pub fn create_app(config: &Config) -> Router {
    let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
    let ocr = OcrClient::new(
        config.textract_api_url.clone(),
        Duration::from_secs(config.ocr_timeout_secs),
    );
    let flow_runner = create_flow_runner(ocr, session_storage.clone());

    let app_state = AppState {
        session_storage,
        flow_runner,
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}", get(get_session_status))
        .route("/sessions/{session_id}/extract", post(extract_papers))
        .route("/sessions/{session_id}/analyze", post(run_analysis))
        .route("/sessions/{session_id}/calibrate", post(submit_calibration))
        .route("/sessions/{session_id}/generate", post(run_generation))
        .route("/sessions/{session_id}/reset", post(reset_session))
        .route("/sessions/{session_id}/export/{stage}", get(export_stage))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Middleware to add a correlation id to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    request.headers_mut().insert(
        "x-correlation-id",
        HeaderValue::from_str(&correlation_id).unwrap(),
    );

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Question Paper Generation Service",
        "version": "1.0.0",
        "description": "Generates exam question papers from sample PDFs, a syllabus and course objectives",
        "endpoints": {
            "POST /sessions": "Create a session with subject details",
            "GET /sessions/{id}": "Session status and stage outputs",
            "POST /sessions/{id}/extract": "Upload two sample PDFs for text extraction (multipart: paper1, paper2)",
            "POST /sessions/{id}/analyze": "Analyze paper structure against the syllabus",
            "POST /sessions/{id}/calibrate": "Submit calibrated generation parameters",
            "POST /sessions/{id}/generate": "Generate a question bank or a paper set",
            "POST /sessions/{id}/reset": "Clear all stage outputs and return to extraction",
            "GET /sessions/{id}/export/{stage}": "Download a stage's raw output as JSON",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(
    State(state): State<AppState>,
    Json(subject): Json<SubjectInfo>,
) -> ApiResult<Value> {
    for (field, value) in [
        ("subject_name", &subject.subject_name),
        ("syllabus", &subject.syllabus),
        ("course_objectives", &subject.course_objectives),
    ] {
        if value.trim().is_empty() {
            return Err(bad_request_error(&format!("{field} is required")));
        }
    }

    let session = create_pipeline_session(subject).await;
    let session_id = session.id.clone();

    state.session_storage.save(session).await.map_err(|e| {
        error!("Failed to create session: {}", e);
        internal_error("Failed to create session", &e.to_string())
    })?;

    info!(session_id = %session_id, "session created");
    Ok(Json(json!({
        "session_id": session_id,
        "current_stage": task_ids::EXTRACT
    })))
}

async fn load_session(state: &AppState, session_id: &str) -> Result<Session, ApiError> {
    match state.session_storage.get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(not_found_error("Session not found", session_id)),
        Err(e) => {
            error!(session_id = %session_id, "Failed to load session: {}", e);
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

async fn save_session(state: &AppState, session: Session) -> Result<(), ApiError> {
    state.session_storage.save(session).await.map_err(|e| {
        error!("Failed to save session: {}", e);
        internal_error("Failed to save session", &e.to_string())
    })
}

async fn run_stage(state: &AppState, session_id: &str) -> Result<ExecutionResult, ApiError> {
    state
        .flow_runner
        .run(session_id)
        .await
        .map_err(stage_error)
}

async fn stage_response(
    state: &AppState,
    session_id: &str,
    result: ExecutionResult,
) -> ApiResult<Value> {
    let session = load_session(state, session_id).await?;
    let status = match result.status {
        ExecutionStatus::WaitingForInput => "waiting_for_input",
        ExecutionStatus::Completed => "completed",
        ExecutionStatus::Error(_) => "error",
    };
    Ok(Json(json!({
        "session_id": session_id,
        "current_stage": session.current_task_id,
        "status": status,
        "response": result.response,
        "status_message": session.status_message
    })))
}

async fn extract_papers(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    let session = load_session(&state, &session_id).await?;
    if session.current_task_id != task_ids::EXTRACT {
        return Err(conflict_error(
            "extraction already completed - reset the session to start over",
        ));
    }

    let mut paper1 = None;
    let mut paper2 = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request_error(&format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let slot = match name.as_str() {
            "paper1" => &mut paper1,
            "paper2" => &mut paper2,
            _ => continue,
        };

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| bad_request_error(&format!("{name} is missing a filename")))?;
        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(bad_request_error(&format!(
                "{name}: only PDF sample papers are supported"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request_error(&format!("failed to read {name}: {e}")))?;
        if bytes.is_empty() {
            return Err(bad_request_error(&format!("{name} is empty")));
        }

        *slot = Some(UploadedPaper::from_bytes(filename, &bytes));
    }

    let (Some(paper1), Some(paper2)) = (paper1, paper2) else {
        return Err(bad_request_error(
            "both sample papers are required (multipart fields paper1 and paper2)",
        ));
    };

    session
        .context
        .set(session_keys::UPLOADED_PAPERS, vec![paper1, paper2])
        .await;

    let outcome = run_stage(&state, &session_id).await;

    // The raw PDFs have served their purpose either way; a retry re-uploads
    session.context.remove(session_keys::UPLOADED_PAPERS).await;

    stage_response(&state, &session_id, outcome?).await
}

async fn run_analysis(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    let mut session = load_session(&state, &session_id).await?;

    if session.current_task_id == task_ids::EXTRACT {
        return Err(conflict_error("no extracted papers - run extraction first"));
    }
    if session.current_task_id != task_ids::ANALYZE {
        // Re-running analysis from a later stage discards downstream results
        info!(session_id = %session_id, from = %session.current_task_id, "re-running analysis");
        session.current_task_id = task_ids::ANALYZE.to_string();
        save_session(&state, session.clone()).await?;
    }

    let result = run_stage(&state, &session_id).await?;

    let analysis: Option<StructureAnalysis> =
        session.context.get(session_keys::STRUCTURE_ANALYSIS).await;
    let summary = analysis.map(|analysis| {
        json!({
            "are_compatible": analysis.are_compatible,
            "compatibility_score": analysis.compatibility_score,
            "compatibility_reason": analysis.compatibility_reason
        })
    });

    let session = load_session(&state, &session_id).await?;
    Ok(Json(json!({
        "session_id": session_id,
        "current_stage": session.current_task_id,
        "response": result.response,
        "status_message": session.status_message,
        "analysis": summary
    })))
}

async fn submit_calibration(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(form): Json<CalibrationForm>,
) -> ApiResult<Value> {
    let session = load_session(&state, &session_id).await?;

    if session.current_task_id != task_ids::CALIBRATE {
        let analysis: Option<StructureAnalysis> =
            session.context.get(session_keys::STRUCTURE_ANALYSIS).await;
        return Err(match analysis {
            Some(analysis) if !analysis.are_compatible => conflict_error(&format!(
                "papers are not compatible, calibration is blocked: {}",
                analysis.compatibility_reason
            )),
            _ => conflict_error("pipeline has not reached calibration - run analysis first"),
        });
    }

    session
        .context
        .set(session_keys::CALIBRATION_FORM, form)
        .await;

    let result = run_stage(&state, &session_id).await?;

    let warnings: Vec<String> = session
        .context
        .get(session_keys::CALIBRATION_WARNINGS)
        .await
        .unwrap_or_default();

    let session = load_session(&state, &session_id).await?;
    Ok(Json(json!({
        "session_id": session_id,
        "current_stage": session.current_task_id,
        "response": result.response,
        "status_message": session.status_message,
        "warnings": warnings
    })))
}

async fn run_generation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Value> {
    let session = load_session(&state, &session_id).await?;

    if session.current_task_id != task_ids::GENERATE {
        return Err(conflict_error(
            "calibration has not been confirmed - generation is gated on it",
        ));
    }

    session
        .context
        .set(session_keys::GENERATION_REQUEST, request)
        .await;

    let result = run_stage(&state, &session_id).await?;

    let warnings: Vec<String> = session
        .context
        .get(session_keys::GENERATION_WARNINGS)
        .await
        .unwrap_or_default();

    let session = load_session(&state, &session_id).await?;
    Ok(Json(json!({
        "session_id": session_id,
        "current_stage": session.current_task_id,
        "response": result.response,
        "status_message": session.status_message,
        "warnings": warnings
    })))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    let mut session = load_session(&state, &session_id).await?;

    for key in session_keys::STAGE_OUTPUTS {
        session.context.remove(key).await;
    }
    session.current_task_id = task_ids::EXTRACT.to_string();
    session.status_message = None;
    save_session(&state, session).await?;

    info!(session_id = %session_id, "session reset to extraction");
    Ok(Json(json!({
        "session_id": session_id,
        "current_stage": task_ids::EXTRACT,
        "status": "reset"
    })))
}

async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionStatusResponse> {
    let session = load_session(&state, &session_id).await?;
    let context = &session.context;

    let compatibility = context
        .get::<StructureAnalysis>(session_keys::STRUCTURE_ANALYSIS)
        .await
        .map(|analysis| {
            json!({
                "are_compatible": analysis.are_compatible,
                "compatibility_score": analysis.compatibility_score,
                "compatibility_reason": analysis.compatibility_reason
            })
        });

    let response = SessionStatusResponse {
        session_id: session.id.clone(),
        current_stage: session.current_task_id.clone(),
        status_message: session.status_message.clone(),
        outputs: StageOutputs {
            extraction: context.contains_key(session_keys::PAPER_TEXTS),
            analysis: context.contains_key(session_keys::STRUCTURE_ANALYSIS),
            calibration: context.contains_key(session_keys::CALIBRATED_STRUCTURE),
            question_bank: context.contains_key(session_keys::QUESTION_BANK),
            paper_set: context.contains_key(session_keys::GENERATED_PAPERS),
        },
        compatibility,
        calibration_defaults: context.get(session_keys::CALIBRATION_DEFAULTS).await,
        calibration_warnings: context.get(session_keys::CALIBRATION_WARNINGS).await,
        generation_warnings: context.get(session_keys::GENERATION_WARNINGS).await,
    };

    Ok(Json(response))
}

/// Lossless JSON download of a stage's raw output object, named with a
/// generation timestamp.
async fn export_stage(
    State(state): State<AppState>,
    Path((session_id, stage)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, &session_id).await?;

    let key = match stage.as_str() {
        "extraction" => session_keys::PAPER_TEXTS,
        "analysis" => session_keys::STRUCTURE_ANALYSIS,
        "calibration" => session_keys::CALIBRATED_STRUCTURE,
        "question-bank" => session_keys::QUESTION_BANK,
        "papers" => session_keys::GENERATED_PAPERS,
        _ => {
            return Err(bad_request_error(
                "unknown stage - expected one of: extraction, analysis, calibration, question-bank, papers",
            ));
        }
    };

    let value: Value = session
        .context
        .get(key)
        .await
        .ok_or_else(|| not_found_error("that stage has produced no output yet", &session_id))?;

    let filename = format!(
        "{}_{}.json",
        stage.replace('-', "_"),
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    );

    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )],
        Json(value),
    ))
}
