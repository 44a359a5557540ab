use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use dawis_core::{DawisError, DawisResult, ScheduleEntry, ScheduleStore};

/// 文件调度存储
///
/// 以JSON数组保存全部调度条目，顺序即插入顺序。
/// 保存采用临时文件+重命名的原子替换，写入中途崩溃不会
/// 破坏上一次持久化的状态。单写者（Beat调度器）。
pub struct FileScheduleStore {
    path: PathBuf,
}

impl FileScheduleStore {
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
}

#[async_trait]
impl ScheduleStore for FileScheduleStore {
    async fn load(&self) -> DawisResult<Vec<ScheduleEntry>> {
        if !self.path.exists() {
            // 尚未有任何条目被持久化
            return Ok(Vec::new());
        }

        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| self.unavailable(format!("读取调度文件失败: {e}")))?;

        serde_json::from_str(&data)
            .map_err(|e| self.unavailable(format!("调度文件损坏: {e}")))
    }

    async fn save(&self, entries: &[ScheduleEntry]) -> DawisResult<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| self.unavailable("调度文件路径没有父目录".to_string()))?;

        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| DawisError::Serialization(format!("序列化调度条目失败: {e}")))?;

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|e| self.unavailable(format!("创建临时文件失败: {e}")))?;
        temp.write_all(&json)
            .map_err(|e| self.unavailable(format!("写入临时文件失败: {e}")))?;
        temp.persist(&self.path)
            .map_err(|e| self.unavailable(format!("替换调度文件失败: {e}")))?;

        debug!("已持久化 {} 个调度条目", entries.len());
        Ok(())
    }
}
