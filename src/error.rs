//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Instance Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum VitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 实例源相关错误
    #[error("实例源错误: {0}")]
    Source(#[from] SourceError),

    /// 缓存存储相关错误
    #[error("缓存存储错误: {0}")]
    Store(#[from] StoreError),

    /// HTTP客户端错误
    #[error("HTTP客户端错误: {0}")]
    Client(#[from] reqwest::Error),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },

    /// 环境变量值无效
    #[error("环境变量 {var} 的值无效: {value}")]
    InvalidEnvValue { var: String, value: String },
}

/// 实例源错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP请求错误
    #[error("请求实例列表失败: {0}")]
    Request(#[from] reqwest::Error),

    /// 实例源返回了非成功状态码
    #[error("实例源返回状态码 {status}")]
    Status { status: u16 },

    /// 响应体不是预期的实例数组
    #[error("实例列表格式错误: {0}")]
    MalformedPayload(#[source] serde_json::Error),
}

/// 缓存存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 存储后端错误
    #[error("存储后端错误: {0}")]
    Backend(String),

    /// 缓存值编解码错误
    #[error("缓存值编解码失败: {0}")]
    Codec(#[source] serde_json::Error),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, VitalsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_converts_into_vitals_error() {
        let err: VitalsError = SourceError::Status { status: 503 }.into();
        assert!(matches!(err, VitalsError::Source(SourceError::Status { status: 503 })));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_malformed_payload_message() {
        let json_err = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = SourceError::MalformedPayload(json_err);
        assert!(err.to_string().starts_with("实例列表格式错误"));
    }
}
