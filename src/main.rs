//! Instance Vitals 主程序入口

use anyhow::{Context, Result};
use clap::Parser;
use instance_vitals::cli::args::{Args, Commands};
use instance_vitals::cli::{CheckCommand, Command, InstancesCommand, ServeCommand, VersionCommand};
use instance_vitals::logging::{LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: args.log_level.clone().into(),
        console: true,
        json_format: args.json_logs,
        ..Default::default()
    };

    let logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Instance Vitals v{} 启动", instance_vitals::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args, logging_system).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args, logging_system: LoggingSystem) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Serve { .. } => Box::new(ServeCommand),
        Commands::Check { .. } => Box::new(CheckCommand::new(logging_system)),
        Commands::Instances => Box::new(InstancesCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command
        .execute(args)
        .await
        .with_context(|| format!("执行 {:?} 失败", args.command))
}
