use super::AppState;
use crate::detect::{ApiResponse, Outcome, ResponseData};
use crate::errors::ValidationError;
use crate::logging::*;
use crate::vision::ChatCompletion;
use axum::{
    Form, Router,
    extract::{
        FromRequest, Json, Request, State,
        rejection::{FormRejection, JsonRejection},
    },
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use std::fmt::Display;
use std::result::Result;
use std::sync::Arc;

pub const PATH: &str = "/api/biology-detect";
const SHORT_PATH: &str = "/biology-detect";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    #[serde(default)]
    pub image_data: Option<String>,
}

/// A [`DetectRequest`] read from a JSON body, or from a url-encoded form body
/// when the content type says so.
#[derive(Debug)]
pub struct DetectPayload(pub DetectRequest);

#[derive(Debug)]
pub enum PayloadRejection {
    Json(JsonRejection),
    Form(FormRejection),
}

impl PayloadRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            PayloadRejection::Json(r) => r.status(),
            PayloadRejection::Form(r) => r.status(),
        }
    }

    pub fn validation_error(&self) -> ValidationError {
        if self.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ValidationError::PayloadTooLarge
        } else {
            ValidationError::MissingPayload
        }
    }
}

impl Display for PayloadRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadRejection::Json(r) => write!(f, "{r}"),
            PayloadRejection::Form(r) => write!(f, "{r}"),
        }
    }
}

impl IntoResponse for PayloadRejection {
    fn into_response(self) -> Response {
        respond(Outcome::Rejected(self.validation_error())).into_response()
    }
}

impl<S> FromRequest<S> for DetectPayload
where
    S: Send + Sync,
{
    type Rejection = PayloadRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(FORM_CONTENT_TYPE));
        if is_form {
            let Form(request) = Form::<DetectRequest>::from_request(req, state)
                .await
                .map_err(PayloadRejection::Form)?;
            Ok(DetectPayload(request))
        } else {
            let Json(request) = Json::<DetectRequest>::from_request(req, state)
                .await
                .map_err(PayloadRejection::Json)?;
            Ok(DetectPayload(request))
        }
    }
}

pub fn add_route<C>(app: Router<Arc<AppState<C>>>) -> Router<Arc<AppState<C>>>
where
    C: ChatCompletion + Send + Sync + 'static,
{
    app.route(PATH, post(biology_detect::<C>))
        .route(SHORT_PATH, post(biology_detect::<C>))
}

async fn biology_detect<C>(
    State(state): State<Arc<AppState<C>>>,
    payload: Result<DetectPayload, PayloadRejection>,
) -> (StatusCode, Json<ApiResponse<ResponseData>>)
where
    C: ChatCompletion + Send + Sync + 'static,
{
    let log = DEFAULT.new(o!("function" => "biology_detect"));

    let outcome = match payload {
        Ok(DetectPayload(request)) => state.detector.detect(request.image_data.as_deref()).await,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!(log, "request body over the size limit"; "rejection" => %rejection);
            Outcome::Rejected(rejection.validation_error())
        }
        Err(rejection) => {
            warn!(log, "unreadable request body"; "rejection" => %rejection);
            Outcome::Rejected(rejection.validation_error())
        }
    };

    let (status, response) = respond(outcome);
    info!(log, "responding"; "code" => response.code, "message" => &response.message);
    (status, response)
}

fn respond(outcome: Outcome) -> (StatusCode, Json<ApiResponse<ResponseData>>) {
    let response = ApiResponse::from(outcome);
    let status = StatusCode::from_u16(response.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response))
}
