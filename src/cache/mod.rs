//! 缓存模块
//!
//! 提供键值存储抽象和带过期重验证的读穿缓存

pub mod read_through;
pub mod store;

// 重新导出主要类型
pub use read_through::{ReadThroughCache, RefreshPolicy, STALE_AFTER};
pub use store::{CacheEntry, KeyedStore, MemoryStore};
