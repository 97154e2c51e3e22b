// src/tools/llm.rs

use crate::config::{DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL};
use crate::error::LlmError;
use serde_json::{Value, json};

/// Client for an Ollama style `/api/generate` endpoint, used to write a
/// plain-language summary of a finished run.
pub struct LlmClient {
    pub endpoint: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

impl LlmClient {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        })
    }

    pub fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let response: Value = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(prompt))
            .send()?
            .error_for_status()?
            .json()?;
        extract_response(&response)
    }
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new(DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL)
    }
}

fn extract_response(body: &Value) -> Result<String, LlmError> {
    body.get("response")
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .ok_or(LlmError::MissingResponse)
}
