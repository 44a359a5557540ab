use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use dawis_core::config::{StorageConfig, HEARTBEAT_EXTENSION};
use dawis_infrastructure::{HeartbeatFile, MaintenanceSentinel};

use crate::decision::{evaluate, Liveness, LivenessObservation};

/// 存活探针
///
/// 纯判定函数之外的薄文件适配层：读取哨兵存在性，扫描运行时
/// 目录下的全部心跳文件并取最旧年龄。与Worker不共享任何内存——
/// 探针存在的意义正是发现连自己都无法响应的Worker。
pub struct LivenessProbe {
    sentinel: MaintenanceSentinel,
    runtime_dir: PathBuf,
    staleness_threshold: Duration,
}

impl LivenessProbe {
    pub fn new(storage: &StorageConfig, staleness_threshold: Duration) -> Self {
        Self {
            sentinel: MaintenanceSentinel::new(storage.sentinel_file()),
            runtime_dir: PathBuf::from(&storage.runtime_dir),
            staleness_threshold,
        }
    }

    /// 采集一次存活观测
    pub fn observe(&self, now: DateTime<Utc>) -> LivenessObservation {
        LivenessObservation {
            sentinel_present: self.sentinel.is_present(),
            heartbeat_age: self.oldest_heartbeat_age(now),
        }
    }

    /// 判定存活状态
    pub fn check(&self, now: DateTime<Utc>) -> Liveness {
        let observation = self.observe(now);
        debug!(
            "存活观测: 哨兵存在={}, 心跳年龄={:?}, 阈值={}秒",
            observation.sentinel_present,
            observation.heartbeat_age,
            self.staleness_threshold.as_secs()
        );
        evaluate(observation, self.staleness_threshold)
    }

    /// 扫描运行时目录，返回最旧心跳的年龄
    ///
    /// 取最旧而非最新：多Worker共存时，一个卡死成员的过期心跳
    /// 不能被健康同伴的新鲜心跳掩盖。任何一个心跳文件不可读
    /// 都视为心跳缺失。
    fn oldest_heartbeat_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        let entries = match std::fs::read_dir(&self.runtime_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("读取运行时目录 {} 失败: {}", self.runtime_dir.display(), e);
                return None;
            }
        };

        let mut oldest: Option<Duration> = None;

        for entry in entries.flatten() {
            let path = entry.path();
            let is_heartbeat = path
                .extension()
                .map(|ext| ext == HEARTBEAT_EXTENSION)
                .unwrap_or(false);
            if !is_heartbeat {
                continue;
            }

            match HeartbeatFile::new(&path).age(now) {
                Ok(age) => {
                    if oldest.map(|current| age > current).unwrap_or(true) {
                        oldest = Some(age);
                    }
                }
                Err(e) => {
                    warn!("心跳文件 {} 不可读: {}", path.display(), e);
                    return None;
                }
            }
        }

        oldest
    }
}
