//! Web 路由处理函数

use super::{ErrorBody, WebAppState};
use crate::error::VitalsError;
use crate::health::Endpoint;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

/// 原始实例列表
pub async fn instances(State(app_state): State<WebAppState>) -> Response {
    endpoints_response(app_state.service.instances().await)
}

/// 全部检测结果
pub async fn checks(State(app_state): State<WebAppState>) -> Response {
    endpoints_response(app_state.service.checks().await)
}

/// 存活端点
pub async fn up(State(app_state): State<WebAppState>) -> Response {
    endpoints_response(app_state.service.up().await)
}

/// 不可用端点
pub async fn down(State(app_state): State<WebAppState>) -> Response {
    endpoints_response(app_state.service.down().await)
}

/// 随机一个存活端点，没有时返回 404
pub async fn random(State(app_state): State<WebAppState>) -> Response {
    match app_state.service.random_up().await {
        Ok(Some(endpoint)) => Json(endpoint).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody::new("no up instances")),
        )
            .into_response(),
        Err(e) => producer_failure(e),
    }
}

fn endpoints_response(result: crate::error::Result<Vec<Endpoint>>) -> Response {
    match result {
        Ok(endpoints) => Json(endpoints).into_response(),
        Err(e) => producer_failure(e),
    }
}

/// 上游数据拉取失败映射为 502
fn producer_failure(e: VitalsError) -> Response {
    error!("请求处理失败: {}", e);
    (StatusCode::BAD_GATEWAY, Json(ErrorBody::new(e.to_string()))).into_response()
}
