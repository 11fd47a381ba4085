//! 通知发送器模块
//!
//! 定义失败通知的trait和消息结构

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 后台刷新失败事件
#[derive(Debug, Clone, Serialize)]
pub struct RefreshFailure {
    /// 缓存键
    pub key: String,
    /// 失败描述
    pub error: String,
    /// 发生时间
    pub timestamp: DateTime<Utc>,
}

impl RefreshFailure {
    /// 以当前时间创建事件
    pub fn new(key: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 失败通知发送器trait
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    /// 发送后台刷新失败通知
    ///
    /// # 参数
    /// * `failure` - 失败事件
    ///
    /// # 返回
    /// * `Result<()>` - 发送结果
    async fn notify_refresh_failure(&self, failure: &RefreshFailure) -> Result<()>;
}

/// 空的通知发送器实现（用于测试或禁用通知）
pub struct NoOpNotifier;

#[async_trait]
impl FailureNotifier for NoOpNotifier {
    async fn notify_refresh_failure(&self, _failure: &RefreshFailure) -> Result<()> {
        Ok(())
    }
}
