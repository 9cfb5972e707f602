//! Generation interface
//!
//! Layers only need `system prompt -> text`. The production implementation
//! calls the model provider component over HTTP.

use crate::error::GenerateError;
use ace_core::{ModelPrompt, ModelResponse};
use reqwest::Client;
use tracing::{debug, error};

#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, stack_type: &str, system_prompt: &str) -> Result<String, GenerateError>;
}

pub struct ModelProviderClient {
    client: Client,
    url: String,
}

impl ModelProviderClient {
    /// `url` is the full generate endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Generator for ModelProviderClient {
    async fn generate(&self, stack_type: &str, system_prompt: &str) -> Result<String, GenerateError> {
        let body = ModelPrompt {
            stack_type: stack_type.to_string(),
            system_prompt: system_prompt.to_string(),
        };
        debug!("Requesting generation ({} prompt bytes)", system_prompt.len());

        // The provider reads the prompt from a GET body.
        let response = self.client.get(&self.url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Model provider error {}: {}", status, error_text);
            return Err(GenerateError::RequestFailed(format!("{}: {}", status, error_text)));
        }

        let text = response.text().await?;
        let parsed: ModelResponse = serde_json::from_str(&text)
            .map_err(|e| GenerateError::InvalidResponse(e.to_string()))?;
        Ok(parsed.response)
    }
}
