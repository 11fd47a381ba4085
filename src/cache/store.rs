//! 键值存储抽象
//!
//! 定义带过期时间的外部键值存储接口，并提供进程内实现

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// `ttl` 大到无法表示时使用的过期时长（约30年）
const MAX_EXPIRY: Duration = Duration::from_secs(86400 * 365 * 30);

/// 缓存条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// 缓存值
    pub value: T,
    /// 写入时间
    pub stored_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// 以当前时间创建条目
    pub fn now(value: T) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
        }
    }

    /// 条目年龄，写入时间在未来时视为0
    pub fn age(&self) -> Duration {
        (Utc::now() - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// 键值存储trait
///
/// 条目在 `ttl` 过后由存储自行淘汰；不同键之间没有顺序或事务保证。
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// 读取条目
    ///
    /// # 参数
    /// * `key` - 键
    ///
    /// # 返回
    /// * `Result<Option<CacheEntry<Vec<u8>>>>` - 不存在或已过期时为 `None`
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<Vec<u8>>>>;

    /// 写入条目
    ///
    /// # 参数
    /// * `key` - 键
    /// * `entry` - 条目
    /// * `ttl` - 存储层过期时间
    async fn put(&self, key: &str, entry: CacheEntry<Vec<u8>>, ttl: Duration) -> Result<()>;
}

/// 存储中的条目及其过期时刻
#[derive(Debug, Clone)]
struct StoredItem {
    entry: CacheEntry<Vec<u8>>,
    expires_at: Instant,
}

/// 进程内键值存储
///
/// 过期条目在读取时惰性删除，也可以通过 [`MemoryStore::purge_expired`] 主动清理。
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, StoredItem>>,
}

impl MemoryStore {
    /// 创建空存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 删除所有过期条目，返回删除数量
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, item| item.expires_at > now);
        let purged = before - items.len();
        if purged > 0 {
            debug!("清理过期缓存条目: {}", purged);
        }
        purged
    }

    /// 当前条目数量（含尚未清理的过期条目）
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// 是否为空
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl KeyedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry<Vec<u8>>>> {
        {
            let items = self.items.read().await;
            match items.get(key) {
                None => return Ok(None),
                Some(item) if item.expires_at > Instant::now() => {
                    return Ok(Some(item.entry.clone()))
                }
                Some(_) => {}
            }
        }

        // 已过期，升级为写锁后再确认一次
        let mut items = self.items.write().await;
        if items
            .get(key)
            .is_some_and(|item| item.expires_at <= Instant::now())
        {
            items.remove(key);
            debug!("缓存条目已过期: {}", key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, entry: CacheEntry<Vec<u8>>, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let item = StoredItem {
            entry,
            expires_at: now.checked_add(ttl).unwrap_or_else(|| now + MAX_EXPIRY),
        };
        self.items.write().await.insert(key.to_string(), item);
        Ok(())
    }
}
