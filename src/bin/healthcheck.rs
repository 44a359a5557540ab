//! 存活看门狗进程
//!
//! 由外部监督者（容器健康检查机制）按固定间隔调用，与Worker进程
//! 不共享任何内存。退出码 0 表示健康；非零即强制终止信号，
//! 监督者据此重启Worker容器。

use std::time::Duration;

use chrono::Utc;
use clap::{Arg, Command};

use dawis_core::{exit_codes, AppConfig};
use dawis_watchdog::{Liveness, LivenessProbe};

fn main() {
    let matches = Command::new("dawis-healthcheck")
        .version("1.0.0")
        .about("dawis平台存活探测")
        .long_about("依次判定：维护哨兵缺失则推迟判定报告健康；心跳缺失或超过阈值则报告不健康")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径"),
        )
        .get_matches();

    let config = match AppConfig::load(matches.get_one::<String>("config").map(|s| s.as_str())) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("加载配置失败: {e}");
            std::process::exit(exit_codes::CONFIG);
        }
    };

    let threshold = Duration::from_secs(config.watchdog.staleness_threshold_seconds);
    let probe = LivenessProbe::new(&config.storage, threshold);

    match probe.check(Utc::now()) {
        Liveness::Healthy => std::process::exit(exit_codes::CLEAN),
        Liveness::Unhealthy => {
            eprintln!(
                "worker心跳缺失或超过 {} 秒未刷新",
                config.watchdog.staleness_threshold_seconds
            );
            std::process::exit(exit_codes::UNHEALTHY);
        }
    }
}
