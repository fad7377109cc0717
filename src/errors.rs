use reqwest::StatusCode;
use thiserror::Error;

/// Client input faults, rejected before the model is called.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("imageData is missing or empty")]
    MissingPayload,
    #[error("imageData contains characters outside the Base64 alphabet")]
    InvalidEncoding,
    #[error("request body exceeds the configured size limit")]
    PayloadTooLarge,
}

impl ValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingPayload | Self::PayloadTooLarge => "参数错误",
            Self::InvalidEncoding => "格式错误",
        }
    }

    pub fn detail(&self) -> &'static str {
        match self {
            Self::MissingPayload => "缺少图片数据（imageData）",
            Self::InvalidEncoding => {
                "仅支持纯 Base64 字符串或 HTTP/HTTPS 图片URL，请上传正确格式的图片数据"
            }
            Self::PayloadTooLarge => "图片数据过大，请压缩后重试",
        }
    }
}

/// Model output faults. Both variants reach the client as a 200 envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("model reply is not JSON: {0}")]
    MalformedResult(String),
    #[error("model reply does not match a known result shape: {0}")]
    Unrecognized(String),
}

/// Failures of the call to the vision model endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("{status} {message}")]
    Status {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("request failed: {0}")]
    Request(String),
    #[error("cannot decode model response: {0}")]
    Decode(String),
    #[error("model response has no content")]
    EmptyReply,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Client-facing category of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceFault {
    AuthError,
    ModelNotFound,
    BadImageFormat,
    GenericServiceError,
}

const INVALID_ARGUMENT_CODES: &[&str] = &[
    "invalid_parameter_error",
    "invalid_argument",
    "InvalidParameter",
];

impl ServiceFault {
    pub const MESSAGE: &'static str = "服务异常";

    pub fn detail(&self) -> &'static str {
        match self {
            Self::AuthError => "API Key 无效，请检查配置",
            Self::ModelNotFound => "模型不存在或无权限，请更换模型或检查权限",
            Self::BadImageFormat => "图片格式不支持，请上传正确的 Base64 或 URL",
            Self::GenericServiceError => "识别服务异常，请稍后重试",
        }
    }
}

impl From<&TransportError> for ServiceFault {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Status { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                ServiceFault::AuthError
            }
            TransportError::Status { status, .. } if *status == StatusCode::NOT_FOUND => {
                ServiceFault::ModelNotFound
            }
            TransportError::Status {
                status,
                code,
                message,
            } if *status == StatusCode::BAD_REQUEST => {
                let by_code = code
                    .as_deref()
                    .is_some_and(|c| INVALID_ARGUMENT_CODES.contains(&c));
                if by_code || message.to_lowercase().contains("invalid argument") {
                    ServiceFault::BadImageFormat
                } else {
                    ServiceFault::GenericServiceError
                }
            }
            _ => ServiceFault::GenericServiceError,
        }
    }
}
