//! 通知模块
//!
//! 将后台刷新失败转发到外部通道

pub mod sender;
pub mod webhook;

// 重新导出主要类型
pub use sender::{FailureNotifier, NoOpNotifier, RefreshFailure};
pub use webhook::WebhookNotifier;
