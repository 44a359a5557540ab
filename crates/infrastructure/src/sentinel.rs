use std::path::{Path, PathBuf};

use tracing::info;

use dawis_core::{DawisError, DawisResult};

/// 维护哨兵文件
///
/// 存在与否即信号本身，内容无意义。Worker初始化完成后放置；
/// 运维删除它即可让Watchdog在受控重启期间失效开放。
pub struct MaintenanceSentinel {
    path: PathBuf,
}

impl MaintenanceSentinel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 放置哨兵，标记初始化完成
    pub fn place(&self) -> DawisResult<()> {
        std::fs::write(&self.path, b"delete me to force a supervised restart\n").map_err(|e| {
            DawisError::StoreUnavailable {
                path: self.path.display().to_string(),
                message: format!("放置哨兵文件失败: {e}"),
            }
        })?;
        info!("维护哨兵已放置: {}", self.path.display());
        Ok(())
    }

    pub fn is_present(&self) -> bool {
        self.path.exists()
    }

    /// 移除哨兵（受控重启前由运维或关闭流程调用）
    pub fn remove(&self) -> DawisResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DawisError::StoreUnavailable {
                path: self.path.display().to_string(),
                message: format!("移除哨兵文件失败: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_place_and_remove() {
        let dir = TempDir::new().unwrap();
        let sentinel = MaintenanceSentinel::new(dir.path().join("delete_me_for_restart"));

        assert!(!sentinel.is_present());

        sentinel.place().unwrap();
        assert!(sentinel.is_present());

        sentinel.remove().unwrap();
        assert!(!sentinel.is_present());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let sentinel = MaintenanceSentinel::new(dir.path().join("delete_me_for_restart"));

        assert!(sentinel.remove().is_ok());
        assert!(sentinel.remove().is_ok());
    }
}
