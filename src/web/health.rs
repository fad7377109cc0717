use super::AppState;
use crate::detect::ApiResponse;
use crate::vision::ChatCompletion;
use axum::{
    Router,
    extract::{Json, State},
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const PATH: &str = "/health";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthData {
    pub port: u16,
    pub timestamp: String,
}

pub fn add_route<C>(app: Router<Arc<AppState<C>>>) -> Router<Arc<AppState<C>>>
where
    C: ChatCompletion + Send + Sync + 'static,
{
    app.route(PATH, get(health::<C>))
}

async fn health<C>(State(state): State<Arc<AppState<C>>>) -> Json<ApiResponse<HealthData>>
where
    C: ChatCompletion + Send + Sync + 'static,
{
    Json(ApiResponse {
        code: 200,
        message: "服务运行正常".to_string(),
        data: HealthData {
            port: state.port,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    })
}
