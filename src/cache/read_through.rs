//! 读穿缓存实现
//!
//! 未命中时同步计算并写入；超过 [`STALE_AFTER`] 的命中立即返回旧值，
//! 同时在后台重新计算。
//!
//! 存储层的 `ttl` 与 `STALE_AFTER` 相互独立：`ttl` 短于 `STALE_AFTER` 时，
//! 条目在变旧之前就会被存储淘汰，后台刷新路径永远不会触发。

use crate::cache::store::{CacheEntry, KeyedStore};
use crate::error::{Result, StoreError};
use crate::notification::{FailureNotifier, NoOpNotifier, RefreshFailure};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 缓存值被视为过期的年龄阈值（固定24小时）
pub const STALE_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// 过期命中时的后台刷新策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// 每次过期命中都启动一次后台刷新
    #[default]
    PerRead,
    /// 同一个键同时最多只有一次后台刷新
    SingleFlight,
}

/// 读穿缓存
#[derive(Clone)]
pub struct ReadThroughCache {
    /// 底层键值存储
    store: Arc<dyn KeyedStore>,
    /// 后台刷新策略
    policy: RefreshPolicy,
    /// 后台刷新失败通知
    notifier: Arc<dyn FailureNotifier>,
    /// 正在后台刷新的键（仅 SingleFlight 使用）
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ReadThroughCache {
    /// 创建新的读穿缓存
    pub fn new(store: Arc<dyn KeyedStore>) -> Self {
        Self {
            store,
            policy: RefreshPolicy::default(),
            notifier: Arc::new(NoOpNotifier),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// 设置后台刷新策略
    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 设置后台刷新失败通知
    pub fn with_notifier(mut self, notifier: Arc<dyn FailureNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// 当前后台刷新策略
    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// 读取缓存值，必要时调用 `producer` 计算
    ///
    /// # 参数
    /// * `key` - 缓存键
    /// * `ttl` - 写入存储时使用的过期时间
    /// * `producer` - 计算新值的函数
    ///
    /// # 返回
    /// * `Result<T>` - 缓存值或新计算的值；未命中时 `producer` 的错误原样返回
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(entry) = self.lookup::<T>(key).await {
            let age = entry.age();
            if age > STALE_AFTER {
                info!(key, age_secs = age.as_secs(), "缓存已过期，返回旧值并后台刷新");
                self.spawn_refresh(key, ttl, producer);
            } else {
                debug!(key, age_secs = age.as_secs(), "缓存命中");
            }
            return Ok(entry.value);
        }

        debug!(key, "缓存未命中，同步计算");
        let value = producer().await?;

        match encode(&value) {
            Ok(bytes) => {
                if let Err(e) = self.store.put(key, CacheEntry::now(bytes), ttl).await {
                    warn!(key, "写入缓存失败: {}", e);
                }
            }
            Err(e) => warn!(key, "缓存值编码失败: {}", e),
        }

        Ok(value)
    }

    /// 读取并解码缓存条目；读取失败或无法解码时按未命中处理
    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, "读取缓存失败，按未命中处理: {}", e);
                return None;
            }
        };

        match serde_json::from_slice::<T>(&raw.value) {
            Ok(value) => Some(CacheEntry {
                value,
                stored_at: raw.stored_at,
            }),
            Err(e) => {
                warn!(key, "缓存值无法解码，按未命中处理: {}", e);
                None
            }
        }
    }

    /// 启动分离的后台刷新任务，调用方不等待其完成
    fn spawn_refresh<T, F, Fut>(&self, key: &str, ttl: Duration, producer: F)
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let guard = match self.policy {
            RefreshPolicy::PerRead => None,
            RefreshPolicy::SingleFlight => match InFlightGuard::acquire(&self.in_flight, key) {
                Some(guard) => Some(guard),
                None => {
                    debug!(key, "已有后台刷新在进行，跳过");
                    return;
                }
            },
        };

        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let key = key.to_string();

        tokio::spawn(async move {
            let _guard = guard;

            let outcome = match producer().await {
                Ok(value) => match encode(&value) {
                    Ok(bytes) => store.put(&key, CacheEntry::now(bytes), ttl).await,
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => info!(key = %key, "后台刷新完成"),
                Err(e) => {
                    error!(key = %key, "后台刷新失败，保留旧值: {}", e);
                    let failure = RefreshFailure::new(key.as_str(), e.to_string());
                    if let Err(e) = notifier.notify_refresh_failure(&failure).await {
                        warn!(key = %key, "发送刷新失败通知失败: {}", e);
                    }
                }
            }
        });
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value).map_err(StoreError::Codec)?)
}

/// 后台刷新期间占用键，任务结束（成功、失败或被取消）时释放
struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    fn acquire(keys: &Arc<Mutex<HashSet<String>>>, key: &str) -> Option<Self> {
        let inserted = keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());

        inserted.then(|| Self {
            keys: Arc::clone(keys),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
