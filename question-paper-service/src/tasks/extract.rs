use async_trait::async_trait;
use stage_flow::{Context, FlowError, NextAction, Result, Task, TaskResult};
use tracing::{info, warn};

use crate::models::{PaperText, SubjectInfo, UploadedPaper};
use crate::ocr::OcrClient;
use crate::tasks::{session_keys, task_ids};

/// Sends the two uploaded sample papers to the extraction endpoint and stores
/// the normalized texts. Nothing is written to the session until the whole
/// call has succeeded, so a failed extraction can simply be retried.
pub struct ExtractTask {
    ocr: OcrClient,
}

impl ExtractTask {
    pub fn new(ocr: OcrClient) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl Task for ExtractTask {
    fn id(&self) -> &str {
        task_ids::EXTRACT
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let subject: SubjectInfo = context
            .get(session_keys::SUBJECT_INFO)
            .await
            .ok_or_else(|| FlowError::ContextError("subject info not found".to_string()))?;

        let uploads: Vec<UploadedPaper> = context
            .get(session_keys::UPLOADED_PAPERS)
            .await
            .ok_or_else(|| {
                FlowError::ContextError("no uploaded papers - upload two sample PDFs".to_string())
            })?;

        let [paper1, paper2] = uploads.as_slice() else {
            return Err(FlowError::TaskExecutionFailed(format!(
                "extraction needs exactly 2 uploaded papers, got {}",
                uploads.len()
            )));
        };

        let bytes1 = decode_upload(paper1)?;
        let bytes2 = decode_upload(paper2)?;

        info!(
            paper1 = %paper1.filename,
            paper2 = %paper2.filename,
            subject_code = %subject.subject_code,
            "starting text extraction"
        );

        let results = self
            .ocr
            .extract(
                (&paper1.filename, bytes1),
                (&paper2.filename, bytes2),
                &subject.subject_code,
            )
            .await
            .map_err(|e| FlowError::TaskExecutionFailed(e.to_string()))?;

        let mut lines: Vec<String> = results
            .iter()
            .map(|result| {
                let mut line = format!(
                    "{}: {} characters ({})",
                    result.file_name,
                    result.text_length,
                    result.status_label()
                );
                if let Some(error) = &result.error {
                    line.push_str(&format!(" - error: {error}"));
                }
                line
            })
            .collect();

        if results.len() != 2 {
            warn!(count = results.len(), "unexpected extraction result count");
            lines.push(format!(
                "warning: expected 2 extraction results, got {}",
                results.len()
            ));
        }

        let texts: Vec<PaperText> = results.into_iter().map(PaperText::from).collect();
        context.set(session_keys::PAPER_TEXTS, &texts).await;

        Ok(TaskResult::new_with_status(
            Some(lines.join("\n")),
            NextAction::Continue,
            Some("text extraction completed".to_string()),
        ))
    }
}

fn decode_upload(upload: &UploadedPaper) -> Result<Vec<u8>> {
    upload.decode().map_err(|e| {
        FlowError::TaskExecutionFailed(format!("uploaded file {} is not valid: {e}", upload.filename))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::subject_info;
    use std::time::Duration;

    async fn context_with_uploads() -> Context {
        let context = Context::new();
        context.set(session_keys::SUBJECT_INFO, subject_info()).await;
        context
            .set(
                session_keys::UPLOADED_PAPERS,
                vec![
                    UploadedPaper::from_bytes("mid1.pdf", b"%PDF-1.4 sample one"),
                    UploadedPaper::from_bytes("mid2.pdf", b"%PDF-1.4 sample two"),
                ],
            )
            .await;
        context
    }

    /// A server that accepts connections and never answers, to force the
    /// client-side timeout.
    async fn unresponsive_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let _socket = socket;
                    tokio::time::sleep(Duration::from_secs(30)).await;
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn timeout_reports_distinct_message_and_stores_nothing() {
        let addr = unresponsive_server().await;
        let task = ExtractTask::new(OcrClient::new(
            format!("http://{addr}/extract"),
            Duration::from_secs(1),
        ));
        let context = context_with_uploads().await;

        let err = task.run(context.clone()).await.unwrap_err();
        assert!(err.to_string().contains("timed out after 1 seconds"));
        // Extraction output stays unset, so analysis remains gated
        assert!(!context.contains_key(session_keys::PAPER_TEXTS));
    }

    #[tokio::test]
    async fn refuses_to_run_without_uploads() {
        let context = Context::new();
        context.set(session_keys::SUBJECT_INFO, subject_info()).await;

        let err = ExtractTask::new(OcrClient::new(
            "http://127.0.0.1:9/extract",
            Duration::from_secs(1),
        ))
        .run(context)
        .await
        .unwrap_err();
        assert!(matches!(err, FlowError::ContextError(_)));
    }
}
