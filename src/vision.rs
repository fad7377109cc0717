mod chat;

use crate::Result;
use crate::config;
use crate::errors::TransportError;
use crate::logging::*;
use crate::prompt::Message;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.1,
        }
    }
}

/// A chat-completion capability that answers role-tagged multimodal messages
/// with a single text reply.
pub trait ChatCompletion {
    fn complete(
        &self,
        messages: Vec<Message>,
        model: &ModelId,
        options: &CompletionOptions,
    ) -> impl Future<Output = std::result::Result<String, TransportError>> + Send;
}

/// Everything needed to reach the model endpoint.
#[derive(Clone)]
pub struct VisionSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: ModelId,
    pub options: CompletionOptions,
}

impl std::fmt::Debug for VisionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("options", &self.options)
            .finish()
    }
}

impl VisionSettings {
    /// Reads the settings from configuration. The API key has no fallback.
    pub fn from_config() -> Result<Self> {
        let api_key = config::get(config::API_KEY)
            .map_err(|_| anyhow!("{} must be set to reach the vision model", config::API_KEY))?;
        Ok(Self {
            base_url: config::get("VISION_BASE_URL")?,
            api_key,
            model: ModelId::new(config::get("VISION_MODEL")?),
            options: CompletionOptions {
                max_tokens: config::get_parsed("VISION_MAX_TOKENS")?,
                temperature: config::get_parsed("VISION_TEMPERATURE")?,
            },
        })
    }
}

/// OpenAI-compatible chat completion client.
pub struct Client {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl Client {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = reqwest::Client::new();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    pub fn from_settings(settings: &VisionSettings) -> Self {
        Self::new(settings.base_url.clone(), settings.api_key.clone())
    }
}

impl ChatCompletion for Client {
    async fn complete(
        &self,
        messages: Vec<Message>,
        model: &ModelId,
        options: &CompletionOptions,
    ) -> std::result::Result<String, TransportError> {
        let log = DEFAULT.new(o!(
            "function" => "complete",
            "model" => model.to_string(),
        ));
        info!(log, "requesting completion");
        let response = chat::chat(
            &self.client,
            &self.base_url,
            &self.api_key,
            model.clone(),
            messages,
            options,
        )
        .await?;
        response.into_content()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_settings_require_api_key() {
        config::unset(config::API_KEY);
        unsafe {
            std::env::remove_var(config::API_KEY);
        }
        let err = VisionSettings::from_config().unwrap_err();
        assert!(err.to_string().contains(config::API_KEY));
    }

    #[test]
    #[serial]
    fn test_settings_from_config() {
        config::set(config::API_KEY, "sk-test");
        config::set("VISION_MAX_TOKENS", "512");
        let settings = VisionSettings::from_config().unwrap();
        assert_eq!(settings.api_key, "sk-test");
        assert_eq!(settings.options.max_tokens, 512);
        assert_eq!(settings.model, ModelId::new("qwen-vl-max"));
        assert!(!format!("{settings:?}").contains("sk-test"));
        config::unset(config::API_KEY);
        config::unset("VISION_MAX_TOKENS");
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let client = Client::new("http://localhost:1234/v1/".to_string(), "k".to_string());
        assert_eq!(client.base_url, "http://localhost:1234/v1");
    }
}
