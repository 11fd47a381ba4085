//! 实例源模块
//!
//! 从外部注册表URL拉取原始端点列表

use crate::error::{Result, SourceError};
use crate::health::Endpoint;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// 实例源trait
#[async_trait]
pub trait InstanceSource: Send + Sync {
    /// 拉取全部端点，返回的端点均未探测
    async fn fetch_all(&self) -> Result<Vec<Endpoint>>;
}

/// 注册表中的单条实例记录，`status` 字段会被忽略
#[derive(Debug, Deserialize)]
struct InstanceRecord {
    url: String,
}

/// 基于HTTP的实例源
#[derive(Debug, Clone)]
pub struct HttpInstanceSource {
    /// HTTP客户端
    client: Client,
    /// 注册表URL
    source_url: String,
}

impl HttpInstanceSource {
    /// 创建新的实例源
    ///
    /// # 参数
    /// * `source_url` - 注册表URL
    /// * `timeout` - 请求超时时间
    pub fn new(source_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            source_url: source_url.into(),
        })
    }

}

#[async_trait]
impl InstanceSource for HttpInstanceSource {
    /// 拉取并解析注册表
    ///
    /// 非 2xx 响应直接返回 `SourceError::Status`，即使响应体是合法的实例数组也不解析。
    async fn fetch_all(&self) -> Result<Vec<Endpoint>> {
        debug!("拉取实例列表: {}", self.source_url);

        let response = self
            .client
            .get(&self.source_url)
            .send()
            .await
            .map_err(SourceError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(SourceError::Request)?;
        let endpoints = parse_instances(&body)?;

        info!("实例列表拉取完成，数量: {}", endpoints.len());
        Ok(endpoints)
    }
}

/// 将注册表响应体解析为未探测的端点列表
pub fn parse_instances(body: &[u8]) -> Result<Vec<Endpoint>> {
    let records: Vec<InstanceRecord> =
        serde_json::from_slice(body).map_err(SourceError::MalformedPayload)?;

    Ok(records
        .into_iter()
        .map(|record| Endpoint::new(record.url))
        .collect())
}
