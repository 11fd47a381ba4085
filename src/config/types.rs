//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::cache::{RefreshPolicy, STALE_AFTER};
use crate::health::ScanConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// 实例注册表URL
    #[serde(default)]
    pub source_url: String,
    /// 缓存条目在存储中的过期时间（秒）
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// 单次探测超时时间（毫秒）
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// 并发探测数
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// 白名单URL列表
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// 同一个键同时最多只允许一次后台刷新
    #[serde(default)]
    pub refresh_single_flight: bool,
    /// 拉取实例列表的超时时间（秒）
    #[serde(default = "default_source_timeout")]
    pub source_timeout_seconds: u64,
    /// 后台刷新失败时通知的webhook URL
    pub failure_webhook_url: Option<String>,
    /// Web 服务器配置
    #[serde(default)]
    pub web: WebConfig,
}

/// Web 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 端口
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            ttl_seconds: default_ttl(),
            timeout_ms: default_timeout_ms(),
            concurrency_limit: default_concurrency_limit(),
            whitelist: Vec::new(),
            refresh_single_flight: false,
            source_timeout_seconds: default_source_timeout(),
            failure_webhook_url: None,
            web: WebConfig::default(),
        }
    }
}

impl Config {
    /// 缓存过期时间
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// 拉取实例列表的超时时间
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }

    /// 构建扫描配置
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            concurrency_limit: self.concurrency_limit,
            per_probe_timeout: Duration::from_millis(self.timeout_ms),
            whitelist: self.whitelist.iter().cloned().collect(),
        }
    }

    /// 后台刷新策略
    pub fn refresh_policy(&self) -> RefreshPolicy {
        if self.refresh_single_flight {
            RefreshPolicy::SingleFlight
        } else {
            RefreshPolicy::PerRead
        }
    }
}

// 默认值函数
fn default_ttl() -> u64 {
    300
}
fn default_timeout_ms() -> u64 {
    2000
}
fn default_concurrency_limit() -> usize {
    5
}
fn default_source_timeout() -> u64 {
    30
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    if config.source_url.trim().is_empty() {
        return Err("实例源URL不能为空（配置 source_url 或环境变量 SOURCE_URL）".to_string());
    }

    if !config.source_url.starts_with("http://") && !config.source_url.starts_with("https://") {
        return Err(format!("实例源URL格式无效: {}", config.source_url));
    }

    if config.ttl_seconds == 0 {
        return Err("缓存过期时间不能为0".to_string());
    }

    if config.timeout_ms == 0 {
        return Err("探测超时时间不能为0".to_string());
    }

    if config.concurrency_limit == 0 {
        return Err("并发探测数不能为0".to_string());
    }

    if config.source_timeout_seconds == 0 {
        return Err("实例源超时时间不能为0".to_string());
    }

    if let Some(ref url) = config.failure_webhook_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("失败通知webhook URL格式无效: {url}"));
        }
    }

    if config.web.bind_address.is_empty() {
        return Err("Web服务器绑定地址不能为空".to_string());
    }

    if config.ttl() < STALE_AFTER {
        warn!(
            "缓存过期时间 {}s 小于过期重验证阈值 {}s，条目会在变旧之前被淘汰",
            config.ttl_seconds,
            STALE_AFTER.as_secs()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            source_url: "https://registry.example/instances.json".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.ttl_seconds, 300);
        assert_eq!(config.timeout_ms, 2000);
        assert_eq!(config.concurrency_limit, 5);
        assert!(config.whitelist.is_empty());
        assert_eq!(config.refresh_policy(), RefreshPolicy::PerRead);
    }

    #[test]
    fn test_scan_config() {
        let mut config = valid_config();
        config.whitelist = vec!["https://a.example".into(), "https://a.example".into()];
        config.timeout_ms = 50;

        let scan = config.scan_config();
        assert_eq!(scan.per_probe_timeout, Duration::from_millis(50));
        assert_eq!(scan.whitelist.len(), 1);
        assert_eq!(scan.concurrency_limit, 5);
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(&valid_config()).is_ok());

        assert!(validate_config(&Config::default()).is_err());

        let mut config = valid_config();
        config.source_url = "ftp://registry.example".into();
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.concurrency_limit = 0;
        assert!(validate_config(&config).unwrap_err().contains("并发"));

        let mut config = valid_config();
        config.timeout_ms = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.ttl_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.failure_webhook_url = Some("hooks.example".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_short_ttl_is_only_a_warning() {
        let mut config = valid_config();
        config.ttl_seconds = 60;
        assert!(validate_config(&config).is_ok());
    }
}
