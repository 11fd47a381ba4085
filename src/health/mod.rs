//! 存活检测模块
//!
//! 提供端点数据结构、单端点探测和有界并发扫描功能

pub mod endpoint;
pub mod prober;
pub mod scanner;

// 重新导出主要类型
pub use endpoint::{Endpoint, EndpointStatus};
pub use prober::{HttpProber, ProbeOutcome, Prober};
pub use scanner::{ConcurrentScanner, ScanConfig};
