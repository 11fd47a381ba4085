//! HTTP存活探测器实现
//!
//! 单个端点的存活检测：共享截止时间、HEAD→GET 回退以及白名单覆盖

use crate::error::Result;
use crate::health::endpoint::{
    Endpoint, EndpointStatus, NOTE_WHITELISTED, NOTE_WHITELISTED_FETCH_FAILED,
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::debug;

/// 超时过大导致截止时间溢出时使用的替代时长（约30年）
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// 探测器trait，定义单个端点的检测接口
#[async_trait]
pub trait Prober: Send + Sync {
    /// 探测单个端点
    ///
    /// 返回填充了状态的新端点，不会失败。
    ///
    /// # 参数
    /// * `endpoint` - 待探测端点
    /// * `timeout` - 整次探测（含回退请求）的时间预算
    /// * `whitelist` - 强制视为存活的URL集合
    async fn probe(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
        whitelist: &HashSet<String>,
    ) -> Endpoint;
}

/// 一次探测的原始结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 收到了HTTP响应
    Response(StatusCode),
    /// 在拿到可用响应之前失败
    Failed(String),
}

/// HTTP探测器实现
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// 客户端本身不设超时，超时由每次探测的截止时间控制。
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self { client })
    }

    /// 发送HEAD请求，遇到 403/405 时在同一截止时间内改用GET
    async fn request_with_fallback(&self, url: &str, deadline: Instant) -> ProbeOutcome {
        let head_status = match self.send_before(Method::HEAD, url, deadline).await {
            Ok(status) => status,
            Err(message) => return ProbeOutcome::Failed(message),
        };

        if head_status == StatusCode::FORBIDDEN || head_status == StatusCode::METHOD_NOT_ALLOWED {
            debug!("HEAD 返回 {}，改用 GET: {}", head_status.as_u16(), url);
            return match self.send_before(Method::GET, url, deadline).await {
                Ok(status) => ProbeOutcome::Response(status),
                Err(message) => ProbeOutcome::Failed(message),
            };
        }

        ProbeOutcome::Response(head_status)
    }

    /// 在截止时间之前完成一次请求
    async fn send_before(
        &self,
        method: Method,
        url: &str,
        deadline: Instant,
    ) -> std::result::Result<StatusCode, String> {
        match timeout_at(deadline, self.client.request(method, url).send()).await {
            Ok(Ok(response)) => Ok(response.status()),
            Ok(Err(e)) => Err(format_request_error(&e)),
            Err(_) => Err("Request timeout".to_string()),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
        whitelist: &HashSet<String>,
    ) -> Endpoint {
        let started = Instant::now();
        let deadline = probe_deadline(started, timeout);

        let outcome = self.request_with_fallback(&endpoint.url, deadline).await;
        let checked = classify(endpoint, outcome, whitelist.contains(&endpoint.url));

        debug!(
            url = %checked.url,
            status = ?checked.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "探测完成"
        );
        checked
    }
}

/// 探测截止时间；`timeout` 大到无法表示时退化为遥远的未来
fn probe_deadline(started: Instant, timeout: Duration) -> Instant {
    started
        .checked_add(timeout)
        .unwrap_or_else(|| started + FAR_FUTURE)
}

/// 根据探测结果和白名单确定端点终态
pub fn classify(endpoint: &Endpoint, outcome: ProbeOutcome, whitelisted: bool) -> Endpoint {
    match outcome {
        ProbeOutcome::Response(status)
            if status.is_success() || status == StatusCode::FORBIDDEN =>
        {
            endpoint.with_status(EndpointStatus::Up)
        }
        ProbeOutcome::Response(_) if whitelisted => endpoint
            .with_status(EndpointStatus::Up)
            .with_note(NOTE_WHITELISTED),
        ProbeOutcome::Response(status) => {
            endpoint.with_status(EndpointStatus::Error(status.as_u16()))
        }
        ProbeOutcome::Failed(_) if whitelisted => endpoint
            .with_status(EndpointStatus::Up)
            .with_note(NOTE_WHITELISTED_FETCH_FAILED),
        ProbeOutcome::Failed(message) => endpoint
            .with_status(EndpointStatus::Down)
            .with_error(message),
    }
}

/// 格式化请求错误信息，使其更加清晰易读
fn format_request_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_builder() {
        format!("Invalid request: {error}")
    } else {
        let error_str = error.to_string();
        if error_str.contains("dns") || error_str.contains("DNS") {
            "DNS resolution failed".to_string()
        } else if error_str.contains("certificate")
            || error_str.contains("tls")
            || error_str.contains("ssl")
        {
            "SSL/TLS certificate error".to_string()
        } else {
            format!("Request failed: {error_str}")
        }
    }
}
