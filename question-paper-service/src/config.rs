use anyhow::anyhow;

/// Environment-sourced configuration. The completion credential and the
/// extraction endpoint are the only required values.
#[derive(Debug, Clone)]
pub struct Config {
    pub textract_api_url: String,
    pub port: u16,
    pub ocr_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // The completion client reads the key per call; fail fast here if it
        // is missing entirely.
        if std::env::var("OPENROUTER_API_KEY").is_err() {
            return Err(anyhow!("OPENROUTER_API_KEY environment variable is required"));
        }

        let textract_api_url = std::env::var("TEXTRACT_API_URL")
            .map_err(|_| anyhow!("TEXTRACT_API_URL environment variable is required"))?;

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let ocr_timeout_secs = std::env::var("OCR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        Ok(Self {
            textract_api_url,
            port,
            ocr_timeout_secs,
        })
    }
}
