//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cache::{KeyedStore, MemoryStore};
use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, TomlConfigLoader};
use crate::error::Result;
use crate::health::endpoint::filter_up;
use crate::logging::LoggingSystem;
use crate::service::VitalsService;
use crate::web::WebServer;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// 内存存储过期条目的清理间隔
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载最终生效的配置
pub async fn load_config(args: &Args) -> Result<Config> {
    let (path, explicit) = args.config_path();
    debug!("加载配置文件: {}", path.display());
    TomlConfigLoader::new(true).load_effective(&path, explicit).await
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 服务命令：启动HTTP服务直到收到 Ctrl-C
pub struct ServeCommand;

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let mut config = load_config(args).await?;
        if let Commands::Serve { bind, port } = &args.command {
            if let Some(bind) = bind {
                config.web.bind_address = bind.clone();
            }
            if let Some(port) = port {
                config.web.port = *port;
            }
        }

        let store = Arc::new(MemoryStore::new());
        spawn_purge_task(Arc::clone(&store));

        let service = VitalsService::from_config(&config, store)?;
        WebServer::new(config.web.clone(), service)
            .start(shutdown_signal())
            .await
    }
}

/// 单次检测命令：绕过检测结果缓存扫描一次并输出JSON
pub struct CheckCommand {
    /// 日志系统，用于输出扫描汇总
    logging: LoggingSystem,
}

impl CheckCommand {
    pub fn new(logging: LoggingSystem) -> Self {
        Self { logging }
    }
}

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let up_only = matches!(args.command, Commands::Check { up_only: true });
        let service = one_shot_service(args).await?;

        let started = Instant::now();
        let results = service.run_scan().await?;
        let up = results.iter().filter(|e| e.is_up()).count();
        self.logging
            .scan_summary_log(results.len(), up, started.elapsed().as_millis() as u64);

        let output = if up_only { filter_up(&results) } else { results };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

/// 实例列表命令
pub struct InstancesCommand;

#[async_trait]
impl Command for InstancesCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let service = one_shot_service(args).await?;
        let instances = service.instances().await?;
        println!("{}", serde_json::to_string_pretty(&instances)?);
        Ok(())
    }
}

async fn one_shot_service(args: &Args) -> Result<VitalsService> {
    let config = load_config(args).await?;
    let store: Arc<dyn KeyedStore> = Arc::new(MemoryStore::new());
    VitalsService::from_config(&config, store)
}

fn spawn_purge_task(store: Arc<MemoryStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                debug!("清理过期缓存条目: {}", purged);
            }
        }
    });
}

/// 等待 Ctrl-C
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("接收到关闭信号，正在关闭..."),
        Err(e) => error!("监听关闭信号失败: {}", e),
    }
}
