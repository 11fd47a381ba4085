//! Webhook通知发送器模块
//!
//! 以JSON形式把刷新失败POST到配置的URL

use crate::notification::sender::{FailureNotifier, RefreshFailure};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Webhook通知发送器
pub struct WebhookNotifier {
    /// HTTP客户端
    client: Client,
    /// webhook URL
    webhook_url: String,
}

impl WebhookNotifier {
    /// 创建新的webhook发送器
    ///
    /// # 参数
    /// * `webhook_url` - 接收通知的URL
    ///
    /// # 返回
    /// * `Result<Self>` - 发送器实例
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl FailureNotifier for WebhookNotifier {
    async fn notify_refresh_failure(&self, failure: &RefreshFailure) -> Result<()> {
        debug!("发送刷新失败通知到webhook: {}", self.webhook_url);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(failure)
            .send()
            .await
            .context("发送webhook通知失败")?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            error!("webhook通知发送失败: {}", status);
            Err(anyhow::anyhow!("webhook通知发送失败: {}", status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_posts_failure_as_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "key": "checks",
                "error": "registry unreachable"
            })))
            .with_status(200)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", server.url())).unwrap();
        let failure = RefreshFailure::new("checks", "registry unreachable");
        notifier.notify_refresh_failure(&failure).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", server.url())).unwrap();
        let result = notifier
            .notify_refresh_failure(&RefreshFailure::new("instances", "boom"))
            .await;

        assert!(result.is_err());
    }
}
