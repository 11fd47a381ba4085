//! 实例端点数据结构
//!
//! 定义被检测的端点及其存活状态

use serde::{Deserialize, Serialize};

/// 白名单覆盖时写入的备注
pub const NOTE_WHITELISTED: &str = "whitelisted";

/// 白名单覆盖且请求失败时写入的备注
pub const NOTE_WHITELISTED_FETCH_FAILED: &str = "whitelisted (fetch failed)";

/// 端点存活状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    /// 端点存活
    Up,
    /// 传输层失败（超时、连接拒绝、取消）
    Down,
    /// 收到了响应，但状态码不可接受
    Error(u16),
}

impl std::fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointStatus::Up => write!(f, "up"),
            EndpointStatus::Down => write!(f, "down"),
            EndpointStatus::Error(code) => write!(f, "error({code})"),
        }
    }
}

impl EndpointStatus {
    /// 判断状态是否为存活
    pub fn is_up(&self) -> bool {
        matches!(self, EndpointStatus::Up)
    }
}

/// 被检测的端点
///
/// 由实例源创建时状态为空，探测后被填充为终态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// 端点URL
    pub url: String,
    /// 存活状态（未探测时为空）
    #[serde(default)]
    pub status: Option<EndpointStatus>,
    /// 备注（白名单覆盖等）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// 失败描述
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Endpoint {
    /// 创建尚未探测的端点
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            note: None,
            error: None,
        }
    }

    /// 以给定状态返回新的端点副本，清除先前的备注和错误
    pub fn with_status(&self, status: EndpointStatus) -> Self {
        Self {
            url: self.url.clone(),
            status: Some(status),
            note: None,
            error: None,
        }
    }

    /// 设置备注
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// 设置失败描述
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// 是否已被探测
    pub fn is_checked(&self) -> bool {
        self.status.is_some()
    }

    /// 是否存活
    pub fn is_up(&self) -> bool {
        self.status.is_some_and(|s| s.is_up())
    }

    /// 是否不可用（down 或 error）
    pub fn is_down(&self) -> bool {
        self.status.is_some_and(|s| !s.is_up())
    }
}

/// 仅保留存活端点
pub fn filter_up(endpoints: &[Endpoint]) -> Vec<Endpoint> {
    endpoints.iter().filter(|e| e.is_up()).cloned().collect()
}

/// 仅保留不可用端点
pub fn filter_down(endpoints: &[Endpoint]) -> Vec<Endpoint> {
    endpoints.iter().filter(|e| e.is_down()).cloned().collect()
}

/// 随机挑选一个存活端点
pub fn pick_random_up(endpoints: &[Endpoint]) -> Option<Endpoint> {
    use rand::seq::IteratorRandom;

    endpoints
        .iter()
        .filter(|e| e.is_up())
        .choose(&mut rand::thread_rng())
        .cloned()
}
