//! Web API模块
//!
//! 通过HTTP暴露实例列表与检测结果视图

use crate::service::VitalsService;
use serde::Serialize;

pub mod handlers;
pub mod server;

pub use server::{create_router, WebServer};

/// Web 应用状态
#[derive(Clone)]
pub struct WebAppState {
    /// 存活服务
    pub service: VitalsService,
}

impl WebAppState {
    /// 创建新的应用状态
    pub fn new(service: VitalsService) -> Self {
        Self { service }
    }
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// 错误信息
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_serialization() {
        let body = serde_json::to_value(ErrorBody::new("实例源返回状态码 503")).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "实例源返回状态码 503" }));
    }
}
