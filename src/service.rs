//! 服务组合模块
//!
//! 把读穿缓存、实例源和并发扫描器组合成对外的读取视图

use crate::cache::{KeyedStore, ReadThroughCache};
use crate::config::Config;
use crate::error::Result;
use crate::health::endpoint::{filter_down, filter_up, pick_random_up};
use crate::health::{ConcurrentScanner, Endpoint, HttpProber, ScanConfig};
use crate::notification::WebhookNotifier;
use crate::source::{HttpInstanceSource, InstanceSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 原始实例列表的缓存键
pub const INSTANCES_KEY: &str = "instances";

/// 检测结果的缓存键
pub const CHECKS_KEY: &str = "checks";

/// 实例存活服务
#[derive(Clone)]
pub struct VitalsService {
    /// 读穿缓存
    cache: ReadThroughCache,
    /// 实例源
    source: Arc<dyn InstanceSource>,
    /// 并发扫描器
    scanner: ConcurrentScanner,
    /// 扫描配置
    scan_config: Arc<ScanConfig>,
    /// 缓存过期时间
    ttl: Duration,
}

impl VitalsService {
    /// 创建新的服务
    pub fn new(
        cache: ReadThroughCache,
        source: Arc<dyn InstanceSource>,
        scanner: ConcurrentScanner,
        scan_config: ScanConfig,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            source,
            scanner,
            scan_config: Arc::new(scan_config),
            ttl,
        }
    }

    /// 根据配置组装服务
    ///
    /// # 参数
    /// * `config` - 已验证的配置
    /// * `store` - 缓存使用的键值存储
    pub fn from_config(config: &Config, store: Arc<dyn KeyedStore>) -> Result<Self> {
        let mut cache = ReadThroughCache::new(store).with_policy(config.refresh_policy());
        if let Some(ref webhook_url) = config.failure_webhook_url {
            cache = cache.with_notifier(Arc::new(WebhookNotifier::new(webhook_url.clone())?));
        }

        let source = Arc::new(HttpInstanceSource::new(
            config.source_url.clone(),
            config.source_timeout(),
        )?);
        let scanner = ConcurrentScanner::new(Arc::new(HttpProber::new()?));

        info!(
            "服务组装完成，实例源: {}, 刷新策略: {:?}",
            config.source_url,
            cache.policy()
        );

        Ok(Self::new(
            cache,
            source,
            scanner,
            config.scan_config(),
            config.ttl(),
        ))
    }

    /// 原始实例列表（未探测）
    pub async fn instances(&self) -> Result<Vec<Endpoint>> {
        let source = Arc::clone(&self.source);
        self.cache
            .get_or_compute(INSTANCES_KEY, self.ttl, move || async move {
                source.fetch_all().await
            })
            .await
    }

    /// 全部检测结果
    pub async fn checks(&self) -> Result<Vec<Endpoint>> {
        let service = self.clone();
        self.cache
            .get_or_compute(CHECKS_KEY, self.ttl, move || async move {
                service.run_scan().await
            })
            .await
    }

    /// 绕过检测结果缓存执行一次扫描（实例列表仍走缓存）
    pub async fn run_scan(&self) -> Result<Vec<Endpoint>> {
        let endpoints = self.instances().await?;
        Ok(self.scanner.scan(endpoints, &self.scan_config).await)
    }

    /// 存活的端点
    pub async fn up(&self) -> Result<Vec<Endpoint>> {
        Ok(filter_up(&self.checks().await?))
    }

    /// 不可用的端点
    pub async fn down(&self) -> Result<Vec<Endpoint>> {
        Ok(filter_down(&self.checks().await?))
    }

    /// 随机一个存活端点
    pub async fn random_up(&self) -> Result<Option<Endpoint>> {
        Ok(pick_random_up(&self.checks().await?))
    }
}
