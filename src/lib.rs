//! Instance Vitals - 带缓存的实例存活检测工具
//!
//! 从注册表拉取实例列表并并发探测每个实例，支持：
//! - HEAD 请求探测，必要时回退到 GET
//! - 白名单实例始终视为存活
//! - 读穿缓存，过期数据先返回再后台刷新
//! - HTTP API 与命令行输出
//! - 结构化日志记录

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;
pub mod service;
pub mod source;
pub mod web;

// 重新导出主要类型
pub use cache::{KeyedStore, MemoryStore, ReadThroughCache, RefreshPolicy};
pub use config::Config;
pub use error::VitalsError;
pub use health::{ConcurrentScanner, Endpoint, EndpointStatus, HttpProber, Prober, ScanConfig};
pub use service::VitalsService;
pub use source::{HttpInstanceSource, InstanceSource};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
