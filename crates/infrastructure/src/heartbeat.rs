use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use dawis_core::{DawisError, DawisResult};

/// 心跳记录器
///
/// 每个Worker进程一个文件，每个工作循环周期覆盖写入一次当前
/// 时间戳（包括空闲轮询）。写入采用临时文件+重命名的原子替换，
/// 并发读取方不会观察到残缺的时间戳。单写者（所属Worker），
/// Watchdog只读。
pub struct HeartbeatFile {
    path: PathBuf,
}

impl HeartbeatFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, message: String) -> DawisError {
        DawisError::StoreUnavailable {
            path: self.path.display().to_string(),
            message,
        }
    }

    /// 刷新心跳时间戳
    ///
    /// 开销须相对任务执行可忽略，不能成为工作循环的瓶颈。
    pub fn touch(&self) -> DawisResult<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| self.unavailable("心跳文件路径没有父目录".to_string()))?;

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| self.unavailable(format!("创建临时文件失败: {e}")))?;
        temp.write_all(Utc::now().to_rfc3339().as_bytes())
            .map_err(|e| self.unavailable(format!("写入心跳失败: {e}")))?;
        temp.persist(&self.path)
            .map_err(|e| self.unavailable(format!("替换心跳文件失败: {e}")))?;

        Ok(())
    }

    /// 读取心跳时间戳
    ///
    /// 优先解析文件内容；内容无法解析时退回文件修改时间
    /// 作为新鲜度代理。
    pub fn read_timestamp(&self) -> DawisResult<DateTime<Utc>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| self.unavailable(format!("读取心跳文件失败: {e}")))?;

        if let Ok(parsed) = DateTime::parse_from_rfc3339(content.trim()) {
            return Ok(parsed.with_timezone(&Utc));
        }

        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|e| self.unavailable(format!("读取心跳文件修改时间失败: {e}")))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    /// 计算心跳距给定时刻的年龄
    pub fn age(&self, now: DateTime<Utc>) -> DawisResult<Duration> {
        let timestamp = self.read_timestamp()?;
        // 时钟回拨时按零龄处理
        Ok((now - timestamp).to_std().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_touch_then_read() {
        let dir = TempDir::new().unwrap();
        let heartbeat = HeartbeatFile::new(dir.path().join("worker-001.heartbeat"));

        heartbeat.touch().unwrap();

        let age = heartbeat.age(Utc::now()).unwrap();
        assert!(age < Duration::from_secs(5));
    }

    #[test]
    fn test_touch_overwrites_previous_timestamp() {
        let dir = TempDir::new().unwrap();
        let heartbeat = HeartbeatFile::new(dir.path().join("worker-001.heartbeat"));

        heartbeat.touch().unwrap();
        let first = heartbeat.read_timestamp().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        heartbeat.touch().unwrap();
        let second = heartbeat.read_timestamp().unwrap();

        assert!(second > first);
    }

    #[test]
    fn test_unparseable_content_falls_back_to_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("worker-001.heartbeat");
        std::fs::write(&path, "not a timestamp").unwrap();

        let heartbeat = HeartbeatFile::new(&path);
        let age = heartbeat.age(Utc::now()).unwrap();
        assert!(age < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let heartbeat = HeartbeatFile::new(dir.path().join("absent.heartbeat"));

        assert!(heartbeat.read_timestamp().is_err());
    }

    #[test]
    fn test_stale_age_measurement() {
        let dir = TempDir::new().unwrap();
        let heartbeat = HeartbeatFile::new(dir.path().join("worker-001.heartbeat"));
        heartbeat.touch().unwrap();

        let future = Utc::now() + chrono::Duration::seconds(350);
        let age = heartbeat.age(future).unwrap();
        assert!(age >= Duration::from_secs(349));
    }
}
