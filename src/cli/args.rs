//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Instance Vitals - 带缓存的实例存活检测工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "instance-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "配置文件路径",
        env = "INSTANCE_VITALS_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        default_value = "info",
        help = "日志级别",
        env = "INSTANCE_VITALS_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 以JSON格式输出日志
    #[arg(long, global = true, help = "以JSON格式输出日志")]
    pub json_logs: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 追踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动HTTP服务
    Serve {
        /// 绑定地址，覆盖配置文件
        #[arg(long, value_name = "ADDR", help = "绑定地址")]
        bind: Option<String>,

        /// 监听端口，覆盖配置文件
        #[arg(short, long, value_name = "PORT", help = "监听端口")]
        port: Option<u16>,
    },

    /// 执行一次扫描并输出JSON结果
    Check {
        /// 只输出存活的端点
        #[arg(long, help = "只输出存活的端点")]
        up_only: bool,
    },

    /// 输出原始实例列表
    Instances,

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 配置文件路径，以及该路径是否为显式指定
    pub fn config_path(&self) -> (PathBuf, bool) {
        match self.config.clone() {
            Some(path) => (path, true),
            None => (crate::config::get_default_config_path(), false),
        }
    }
}
