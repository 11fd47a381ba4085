//! Web服务器实现
//!
//! 提供HTTP服务器和路由管理

use super::{handlers, WebAppState};
use crate::config::WebConfig;
use crate::error::{ConfigError, Result, VitalsError};
use crate::service::VitalsService;
use axum::{http::Method, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// 创建路由
pub fn create_router(state: WebAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/instances", get(handlers::instances))
        .route("/checks", get(handlers::checks))
        .route("/up", get(handlers::up))
        .route("/down", get(handlers::down))
        .route("/random", get(handlers::random))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Web服务器
pub struct WebServer {
    /// 配置
    config: WebConfig,
    /// 应用状态
    state: WebAppState,
}

impl WebServer {
    /// 创建新的Web服务器
    pub fn new(config: WebConfig, service: VitalsService) -> Self {
        Self {
            config,
            state: WebAppState::new(service),
        }
    }

    /// 监听地址
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        addr.parse::<SocketAddr>().map_err(|e| {
            VitalsError::from(ConfigError::ValidationError(format!(
                "无效的监听地址 {}: {}",
                addr, e
            )))
        })
    }

    /// 启动Web服务器，直到 `shutdown` 完成
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.socket_addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Web服务器已启动: http://{}", listener.local_addr()?);

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Web服务器已关闭");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, ReadThroughCache};
    use crate::health::{ConcurrentScanner, Endpoint, EndpointStatus, Prober, ScanConfig};
    use crate::source::InstanceSource;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    struct FixedSource(Vec<&'static str>);

    #[async_trait]
    impl InstanceSource for FixedSource {
        async fn fetch_all(&self) -> Result<Vec<Endpoint>> {
            Ok(self.0.iter().map(|u| Endpoint::new(*u)).collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl InstanceSource for FailingSource {
        async fn fetch_all(&self) -> Result<Vec<Endpoint>> {
            Err(crate::error::SourceError::Status { status: 503 }.into())
        }
    }

    struct UrlProber;

    #[async_trait]
    impl Prober for UrlProber {
        async fn probe(
            &self,
            endpoint: &Endpoint,
            _timeout: Duration,
            _whitelist: &HashSet<String>,
        ) -> Endpoint {
            if endpoint.url.contains("down") {
                endpoint.with_status(EndpointStatus::Error(500))
            } else {
                endpoint.with_status(EndpointStatus::Up)
            }
        }
    }

    fn router(source: Arc<dyn InstanceSource>) -> Router {
        let service = VitalsService::new(
            ReadThroughCache::new(Arc::new(MemoryStore::new())),
            source,
            ConcurrentScanner::new(Arc::new(UrlProber)),
            ScanConfig::default(),
            Duration::from_secs(300),
        );
        create_router(WebAppState::new(service))
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_instances_route() {
        let app = router(Arc::new(FixedSource(vec!["https://a.example"])));
        let (status, body) = get_json(app, "/instances").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["url"], "https://a.example");
        assert!(body[0].get("status").map_or(true, Value::is_null));
    }

    #[tokio::test]
    async fn test_check_views() {
        let app = router(Arc::new(FixedSource(vec![
            "https://a.example",
            "https://down.example",
        ])));

        let (status, checks) = get_json(app.clone(), "/checks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(checks.as_array().unwrap().len(), 2);

        let (_, up) = get_json(app.clone(), "/up").await;
        assert_eq!(up.as_array().unwrap().len(), 1);
        assert_eq!(up[0]["status"], "up");

        let (_, down) = get_json(app.clone(), "/down").await;
        assert_eq!(down[0]["url"], "https://down.example");
        assert_eq!(down[0]["status"], serde_json::json!({ "error": 500 }));

        let (status, random) = get_json(app, "/random").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(random["url"], "https://a.example");
    }

    #[tokio::test]
    async fn test_random_without_up_instances() {
        let app = router(Arc::new(FixedSource(vec!["https://down.example"])));
        let (status, body) = get_json(app, "/random").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_producer_failure_maps_to_bad_gateway() {
        let app = router(Arc::new(FailingSource));
        let (status, body) = get_json(app, "/checks").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }

    #[test]
    fn test_socket_addr() {
        let service = VitalsService::new(
            ReadThroughCache::new(Arc::new(MemoryStore::new())),
            Arc::new(FailingSource),
            ConcurrentScanner::new(Arc::new(UrlProber)),
            ScanConfig::default(),
            Duration::from_secs(1),
        );

        let server = WebServer::new(WebConfig::default(), service.clone());
        assert_eq!(server.socket_addr().unwrap().port(), 3000);

        let bad = WebServer::new(
            WebConfig {
                bind_address: "not an address".to_string(),
                port: 80,
            },
            service,
        );
        assert!(bad.socket_addr().is_err());
    }
}
