//! One detection request from payload to envelope.
//!
//! `Received -> Normalizing -> Prompting -> Calling -> Classifying -> Responded`,
//! with [`Outcome`] naming the terminal state. Every failure ends in an
//! envelope; nothing escapes to the HTTP layer as a fault.

use crate::classify::{RecognitionResult, classify};
use crate::errors::{ClassificationError, ServiceFault, ValidationError};
use crate::logging::*;
use crate::normalize::normalize;
use crate::prompt::build_prompt;
use crate::vision::{ChatCompletion, CompletionOptions, ModelId};
use serde::{Deserialize, Serialize};

pub const SUCCESS_MESSAGE: &str = "识别成功";
pub const UNREADABLE_MESSAGE: &str = "结果解析失败";
pub const UNREADABLE_NOTICE: &str = "识别结果格式异常，请上传清晰图片重试";

/// The `{code, message, data}` wrapper every response uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Recognized(RecognitionResult),
    Detail { is_biological: bool, detail: String },
    Notice { is_biological: bool, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Input validation failed (400)
    Rejected(ValidationError),
    /// The model call failed (500)
    TransportFailed(ServiceFault),
    /// The model reply could not be read (200)
    Unreadable(ClassificationError),
    Classified(RecognitionResult),
}

impl Outcome {
    pub fn code(&self) -> u16 {
        match self {
            Outcome::Rejected(_) => 400,
            Outcome::TransportFailed(_) => 500,
            Outcome::Unreadable(_) | Outcome::Classified(_) => 200,
        }
    }
}

impl From<Outcome> for ApiResponse<ResponseData> {
    fn from(outcome: Outcome) -> Self {
        let code = outcome.code();
        let (message, data) = match outcome {
            Outcome::Rejected(err) => (
                err.message(),
                ResponseData::Detail {
                    is_biological: false,
                    detail: err.detail().to_string(),
                },
            ),
            Outcome::TransportFailed(fault) => (
                ServiceFault::MESSAGE,
                ResponseData::Detail {
                    is_biological: false,
                    detail: fault.detail().to_string(),
                },
            ),
            Outcome::Unreadable(_) => (
                UNREADABLE_MESSAGE,
                ResponseData::Notice {
                    is_biological: false,
                    message: UNREADABLE_NOTICE.to_string(),
                },
            ),
            Outcome::Classified(result) => (SUCCESS_MESSAGE, ResponseData::Recognized(result)),
        };
        ApiResponse {
            code,
            message: message.to_string(),
            data,
        }
    }
}

pub struct Detector<C> {
    client: C,
    model: ModelId,
    options: CompletionOptions,
}

impl<C: ChatCompletion> Detector<C> {
    pub fn new(client: C, model: ModelId, options: CompletionOptions) -> Self {
        Self {
            client,
            model,
            options,
        }
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub async fn detect(&self, image_data: Option<&str>) -> Outcome {
        let log = DEFAULT.new(o!("function" => "detect"));
        info!(log, "received";
            "image_data" => image_data.map(preview).unwrap_or("undefined"),
        );

        if image_data.is_some_and(|raw| raw.starts_with("data:")) {
            debug!(log, "data url prefix detected");
        }
        let image = match normalize(image_data) {
            Ok(image) => image,
            Err(err) => {
                warn!(log, "rejected"; "reason" => %err);
                return Outcome::Rejected(err);
            }
        };
        info!(log, "normalized"; "image" => preview(image.as_str()));

        let messages = build_prompt(&image).into_messages();
        info!(log, "calling model"; "model" => %self.model);
        let reply = match self
            .client
            .complete(messages, &self.model, &self.options)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                let fault = ServiceFault::from(&err);
                error!(log, "model call failed";
                    "error" => %err,
                    "category" => ?fault,
                );
                return Outcome::TransportFailed(fault);
            }
        };
        info!(log, "model replied"; "raw" => reply.trim());

        match classify(&reply) {
            Ok(result) => {
                info!(log, "classified"; "is_biological" => result.is_biological());
                for advisory in result.advisories() {
                    warn!(log, "advisory field not honored"; "advisory" => %advisory);
                }
                Outcome::Classified(result)
            }
            Err(err) => {
                warn!(log, "cannot classify reply"; "error" => %err);
                Outcome::Unreadable(err)
            }
        }
    }
}

#[cfg(test)]
mod tests;
