use super::{CompletionOptions, ModelId};
use crate::errors::TransportError;
use crate::logging::*;
use crate::prompt::Message;
use serde::{Deserialize, Serialize};
use std::result::Result;

#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub model: ModelId,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ReplyMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl Response {
    pub fn into_content(self) -> Result<String, TransportError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(TransportError::EmptyReply)
    }
}

pub async fn chat(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: ModelId,
    messages: Vec<Message>,
    options: &CompletionOptions,
) -> Result<Response, TransportError> {
    let log = DEFAULT.new(o!("function" => "chat"));
    let request = Request {
        model,
        messages,
        max_tokens: options.max_tokens,
        temperature: options.temperature,
    };
    let url = format!("{}/chat/completions", base_url);
    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = status_error(status, &body);
        warn!(log, "model endpoint rejected the request"; "status" => status.as_u16());
        return Err(err);
    }

    let response: Response = response.json().await?;
    debug!(log, "completion received";
        "id" => ?response.id,
        "finish_reason" => ?response.choices.first().and_then(|c| c.finish_reason.clone()),
    );
    Ok(response)
}

fn status_error(status: reqwest::StatusCode, body: &str) -> TransportError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) => TransportError::Status {
            status,
            code: error.code,
            message: error.message.unwrap_or_default(),
        },
        Err(_) => TransportError::Status {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}
