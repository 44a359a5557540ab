use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, Command};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dawis_core::{exit_codes, AppConfig, DawisError};

use crate::app::{AppMode, Application};
use crate::shutdown::ShutdownManager;

/// 通用的应用启动配置
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    pub config_path: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub worker_id: Option<String>,
}

/// 初始化日志系统
pub fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 解析应用运行模式
pub fn parse_app_mode(mode_str: &str, config: &AppConfig) -> Result<AppMode> {
    match mode_str {
        "beat" => {
            if !config.beat.enabled {
                return Err(anyhow::anyhow!("Beat模式被禁用，请检查配置"));
            }
            Ok(AppMode::Beat)
        }
        "worker" => {
            if !config.worker.enabled {
                return Err(anyhow::anyhow!("Worker模式被禁用，请检查配置"));
            }
            Ok(AppMode::Worker)
        }
        "all" => Ok(AppMode::All),
        _ => Err(anyhow::anyhow!("不支持的运行模式: {mode_str}")),
    }
}

/// 启动应用程序的通用函数
pub async fn start_application(
    startup_config: StartupConfig,
    mode_str: &str,
    service_name: &str,
) -> Result<()> {
    // 先加载配置，DAWIS_前缀环境变量里的日志级别才能生效
    let mut config = AppConfig::load(startup_config.config_path.as_deref())
        .context("加载配置失败")?;

    if let Some(ref worker_id) = startup_config.worker_id {
        config.worker.worker_id = worker_id.clone();
    }

    let mode = parse_app_mode(mode_str, &config)?;

    let log_level = startup_config
        .log_level
        .unwrap_or_else(|| config.log.level.clone());
    let log_format = startup_config
        .log_format
        .unwrap_or_else(|| config.log.format.clone());
    init_logging(&log_level, &log_format)?;

    info!("启动 {} 服务", service_name);
    if let Some(ref path) = startup_config.config_path {
        info!("配置文件: {}", path);
    }
    info!("运行模式: {:?}", mode);

    // 创建应用实例
    let app = Application::new(config, mode).await?;

    // 创建优雅关闭管理器
    let shutdown_manager = ShutdownManager::new();

    // 启动应用
    let (app_handle, mut result_rx) = {
        let app = Arc::new(app);
        let shutdown_rx = shutdown_manager.subscribe().await;
        let (result_tx, result_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            let result = app.run(shutdown_rx).await;
            if let Err(ref e) = result {
                error!("应用运行失败: {e}");
            }
            let _ = result_tx.send(result);
        });
        (handle, result_rx)
    };

    // 等待关闭信号，或应用因致命错误自行退出
    let early_result = tokio::select! {
        _ = wait_for_shutdown_signal() => None,
        result = &mut result_rx => Some(result),
    };

    if let Some(result) = early_result {
        // 应用在收到关闭信号之前就退出了（如调度存储不可用）
        let _ = app_handle.await;
        return result.unwrap_or_else(|_| Err(anyhow::anyhow!("应用任务异常中止")));
    }

    info!("收到关闭信号，开始优雅关闭...");
    shutdown_manager.shutdown().await;

    // 等待应用关闭，设置超时
    match tokio::time::timeout(Duration::from_secs(30), app_handle).await {
        Ok(result) => {
            if let Err(e) = result {
                error!("应用关闭时发生错误: {e}");
            } else {
                info!("{} 服务已优雅关闭", service_name);
            }
        }
        Err(_) => {
            warn!("{} 服务关闭超时，强制退出", service_name);
        }
    }

    info!("{} 服务已退出", service_name);
    Ok(())
}

/// 通用CLI入口
pub async fn run_cli(
    name: &'static str,
    about: &'static str,
    long_about: Option<&'static str>,
    custom_args: Vec<Arg>,
    mode_str: &str,
    service_name: &str,
) -> Result<()> {
    let mut command = Command::new(name)
        .version("1.0.0")
        .about(about)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别（仅控制详细程度）")
                .value_parser(["debug", "info"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式")
                .value_parser(["json", "pretty"]),
        );

    if let Some(long_about) = long_about {
        command = command.long_about(long_about);
    }
    for arg in custom_args {
        command = command.arg(arg);
    }

    let matches = command.get_matches();

    let startup_config = StartupConfig {
        config_path: matches.get_one::<String>("config").cloned(),
        log_level: matches.get_one::<String>("log-level").cloned(),
        log_format: matches.get_one::<String>("log-format").cloned(),
        worker_id: matches
            .try_get_one::<String>("worker-id")
            .ok()
            .flatten()
            .cloned(),
    };

    // 自带--mode参数的二进制（组合模式）优先于调用方给定的固定模式
    let mode = matches
        .try_get_one::<String>("mode")
        .ok()
        .flatten()
        .cloned()
        .unwrap_or_else(|| mode_str.to_string());

    start_application(startup_config, &mode, service_name).await
}

/// 等待关闭信号
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.unwrap_or_else(|e| {
            error!("安装Ctrl+C信号处理器失败: {}", e);
            std::process::exit(exit_codes::FATAL);
        })
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {}", e);
                std::process::exit(exit_codes::FATAL);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}

/// 将顶层错误映射为进程退出码
///
/// 监督者据此区分可重启的致命错误与需要人工干预的配置错误。
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<DawisError>() {
        Some(DawisError::Configuration(_)) => exit_codes::CONFIG,
        _ => exit_codes::FATAL,
    }
}
