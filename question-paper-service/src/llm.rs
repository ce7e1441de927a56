use anyhow::anyhow;
use rig::{agent::Agent, client::CompletionClient, completion::Prompt, providers::openrouter};
use serde::de::DeserializeOwned;
use serde_json::json;

const MODEL: &str = "openai/gpt-4.1-mini";

/// Fixed sampling parameters for one completion call-site.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub model: &'static str,
    pub temperature: f64,
    pub max_tokens: u64,
}

/// Structure analysis is an extraction job: keep it close to deterministic.
pub const STRUCTURE_ANALYSIS: CompletionParams = CompletionParams {
    model: MODEL,
    temperature: 0.1,
    max_tokens: 8000,
};

/// Question banks want variety across a large pool.
pub const QUESTION_BANK: CompletionParams = CompletionParams {
    model: MODEL,
    temperature: 0.4,
    max_tokens: 16000,
};

/// Paper sets want variety, but less than the bank.
pub const PAPER_SET: CompletionParams = CompletionParams {
    model: MODEL,
    temperature: 0.3,
    max_tokens: 16000,
};

fn json_agent(
    preamble: &str,
    params: CompletionParams,
) -> anyhow::Result<Agent<openrouter::CompletionModel>> {
    let api_key = std::env::var("OPENROUTER_API_KEY")
        .map_err(|_| anyhow!("OPENROUTER_API_KEY not set"))?;
    let client = openrouter::Client::new(&api_key);
    let agent = client
        .agent(params.model)
        .preamble(preamble)
        .temperature(params.temperature)
        .max_tokens(params.max_tokens)
        .additional_params(json!({ "response_format": { "type": "json_object" } }))
        .build();
    Ok(agent)
}

/// One synchronous completion request with JSON-object output forced, parsed
/// strictly into `T`. Transport failures and schema mismatches both come back
/// as errors; no retries, no streaming, nothing partial.
pub async fn completion_json<T: DeserializeOwned>(
    system: &str,
    user: &str,
    params: CompletionParams,
) -> anyhow::Result<T> {
    let agent = json_agent(system, params)?;
    let reply = agent
        .prompt(user)
        .await
        .map_err(|e| anyhow!("completion request failed: {e}"))?;
    serde_json::from_str(&reply)
        .map_err(|e| anyhow!("completion reply failed schema validation: {e}"))
}
