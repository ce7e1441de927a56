use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::models::OcrResult;

/// Failures of the extraction endpoint, kept distinct so each surfaces its
/// own operator-visible message. None of them are retried.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("text extraction timed out after {0} seconds")]
    Timeout(u64),

    #[error("extraction endpoint returned HTTP {code}: {detail}")]
    Status { code: u16, detail: String },

    #[error("unrecognized extraction response envelope: {0}")]
    Envelope(String),

    #[error("malformed extraction result: {0}")]
    Response(#[from] serde_json::Error),

    #[error("extraction request failed: {0}")]
    Transport(String),
}

/// Client for the external OCR extraction endpoint.
///
/// Posts two PDFs plus the subject identifier as one multipart request and
/// normalizes the endpoint's two response envelopes into a flat result list.
#[derive(Clone)]
pub struct OcrClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl OcrClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Upload both sample papers for extraction. OCR is slow, so the timeout
    /// is several minutes; a timeout is reported distinctly from other
    /// transport failures.
    pub async fn extract(
        &self,
        paper1: (&str, Vec<u8>),
        paper2: (&str, Vec<u8>),
        csm_id: &str,
    ) -> Result<Vec<OcrResult>, OcrError> {
        let form = Form::new()
            .part("paper1", pdf_part(paper1.0, paper1.1)?)
            .part("paper2", pdf_part(paper2.0, paper2.1)?)
            .text("csm_id", csm_id.to_string())
            .text("mode", "1");

        info!(endpoint = %self.endpoint, csm_id = %csm_id, "uploading papers for extraction");

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(OcrError::Status {
                code: status.as_u16(),
                detail,
            });
        }

        let envelope: Value = response.json().await.map_err(|e| self.classify(e))?;
        let results = parse_envelope(envelope)?;

        info!(result_count = results.len(), "extraction completed");
        Ok(results)
    }

    fn classify(&self, error: reqwest::Error) -> OcrError {
        if error.is_timeout() {
            OcrError::Timeout(self.timeout.as_secs())
        } else {
            OcrError::Transport(error.to_string())
        }
    }
}

fn pdf_part(filename: &str, bytes: Vec<u8>) -> Result<Part, OcrError> {
    Part::bytes(bytes)
        .file_name(filename.to_string())
        .mime_str("application/pdf")
        .map_err(|e| OcrError::Transport(e.to_string()))
}

/// Normalize the endpoint's response shapes into the result list.
///
/// Accepted envelopes: a top-level `results` list, or a `body` field holding
/// either the same object or a JSON-encoded string of it. Anything else is
/// rejected as an envelope error.
pub fn parse_envelope(envelope: Value) -> Result<Vec<OcrResult>, OcrError> {
    if let Some(results) = envelope.get("results") {
        return Ok(serde_json::from_value(results.clone())?);
    }

    if let Some(body) = envelope.get("body") {
        let body = match body {
            Value::String(raw) => serde_json::from_str::<Value>(raw)?,
            other => other.clone(),
        };
        return match body.get("results") {
            Some(results) => Ok(serde_json::from_value(results.clone())?),
            None => Err(OcrError::Envelope(
                "body carries no results list".to_string(),
            )),
        };
    }

    let keys = match envelope.as_object() {
        Some(map) => map.keys().cloned().collect::<Vec<_>>().join(", "),
        None => envelope.to_string(),
    };
    Err(OcrError::Envelope(format!(
        "expected results or body, got: {keys}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_record(name: &str) -> Value {
        json!({
            "file_name": name,
            "extracted_text": "UNIT-I\n1a) State and prove the parallelogram law.",
            "text_length": 47,
            "final_status": "SUCCEEDED"
        })
    }

    #[test]
    fn parses_direct_results_envelope() {
        let envelope = json!({ "results": [result_record("paper1.pdf"), result_record("paper2.pdf")] });
        let results = parse_envelope(envelope).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].file_name, "paper1.pdf");
        assert_eq!(results[0].status_label(), "SUCCEEDED");
    }

    #[test]
    fn parses_body_object_envelope() {
        let envelope = json!({ "body": { "results": [result_record("a.pdf")] } });
        let results = parse_envelope(envelope).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn parses_body_string_envelope_with_second_decode() {
        let inner = json!({ "results": [result_record("a.pdf")] }).to_string();
        let envelope = json!({ "body": inner });
        let results = parse_envelope(envelope).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text_length, 47);
    }

    #[test]
    fn rejects_unrecognized_envelope() {
        let envelope = json!({ "payload": [] });
        let err = parse_envelope(envelope).unwrap_err();
        assert!(matches!(err, OcrError::Envelope(_)));
        assert!(err.to_string().contains("payload"));
    }

    #[test]
    fn rejects_body_without_results() {
        let envelope = json!({ "body": { "message": "done" } });
        assert!(matches!(
            parse_envelope(envelope).unwrap_err(),
            OcrError::Envelope(_)
        ));
    }

    #[test]
    fn rejects_record_missing_required_fields() {
        let envelope = json!({ "results": [{ "file_name": "a.pdf" }] });
        assert!(matches!(
            parse_envelope(envelope).unwrap_err(),
            OcrError::Response(_)
        ));
    }

    #[test]
    fn timeout_error_names_the_bound() {
        let message = OcrError::Timeout(500).to_string();
        assert!(message.contains("timed out after 500 seconds"));
    }
}
