//! 日志系统模块
//!
//! 基于 tracing 的结构化日志，`log` 宏经 LogTracer 转发

use log::LevelFilter;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevelFilter};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 探测时请求量很大的 HTTP 依赖，默认压到 warn
const HTTP_CLIENT_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// 已安装的日志配置；`None` 表示尚未安装
static INSTALLED: OnceLock<Mutex<Option<LogConfig>>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径（仅在不输出到控制台时使用）
    pub file_path: Option<PathBuf>,
    /// 是否输出到控制台
    pub console: bool,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 是否压低 HTTP 客户端依赖的日志
    pub quiet_http_clients: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            file_path: None,
            console: true,
            json_format: false,
            quiet_http_clients: true,
        }
    }
}

/// 日志系统管理器
#[derive(Debug, Clone)]
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 全局 subscriber 只安装一次，之后的调用直接返回。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let installed = INSTALLED.get_or_init(|| Mutex::new(None));
        let mut installed = installed.lock().unwrap_or_else(PoisonError::into_inner);

        if installed.is_none() {
            install_log_tracer()?;
            install_subscriber(&config)?;
            *installed = Some(config.clone());
        }

        Ok(Self { config })
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        Self::current_config().is_some()
    }

    /// 获取已安装的日志配置
    pub fn current_config() -> Option<LogConfig> {
        INSTALLED
            .get()
            .and_then(|m| m.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// 记录一次扫描的汇总日志
    pub fn scan_summary_log(&self, total: usize, up: usize, elapsed_ms: u64) {
        let down = total.saturating_sub(up);
        if self.config.json_format {
            tracing::info!(
                target: "instance_vitals::scan",
                total,
                up,
                down,
                elapsed_ms,
                "scan_summary"
            );
        } else {
            tracing::info!(
                target: "instance_vitals::scan",
                "SCAN: 共 {} 个端点，存活 {}，不可用 {} ({}ms)",
                total,
                up,
                down,
                elapsed_ms
            );
        }
    }
}

/// 初始化 LogTracer（log crate 到 tracing 的桥接），只执行一次
fn install_log_tracer() -> anyhow::Result<()> {
    static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

    LOG_TRACER_INIT
        .get_or_init(|| tracing_log::LogTracer::init().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
    Ok(())
}

/// 构建过滤器：`RUST_LOG` 优先，其次是配置的级别
fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level_directive(config.level))
        .from_env_lossy();

    if config.quiet_http_clients {
        for target in HTTP_CLIENT_TARGETS {
            if let Ok(directive) = format!("{target}=warn").parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

fn install_subscriber(config: &LogConfig) -> anyhow::Result<()> {
    let filter = build_filter(config);

    let layer = match (&config.file_path, config.console) {
        (Some(path), false) => {
            let file = std::fs::File::create(path)
                .map_err(|e| anyhow::anyhow!("创建日志文件失败 {}: {}", path.display(), e))?;
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .boxed()
        }
        _ if config.json_format => fmt::layer()
            .json()
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_current_span(true)
            .boxed(),
        _ => fmt::layer()
            .with_timer(fmt::time::ChronoUtc::rfc_3339())
            .with_target(true)
            .boxed(),
    };

    match registry().with(filter).with(layer).try_init() {
        Ok(()) => {
            tracing::debug!("日志系统初始化完成: {:?}", config);
            Ok(())
        }
        // 其他代码（例如测试框架）已安装了全局 subscriber
        Err(e) if e.to_string().contains("already been set") => Ok(()),
        Err(e) => Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", e)),
    }
}

/// 将 log::LevelFilter 转换为 tracing 的指令
fn level_directive(level: LevelFilter) -> Directive {
    let level = match level {
        LevelFilter::Off => TracingLevelFilter::OFF,
        LevelFilter::Error => TracingLevelFilter::ERROR,
        LevelFilter::Warn => TracingLevelFilter::WARN,
        LevelFilter::Info => TracingLevelFilter::INFO,
        LevelFilter::Debug => TracingLevelFilter::DEBUG,
        LevelFilter::Trace => TracingLevelFilter::TRACE,
    };
    Directive::from(level)
}
