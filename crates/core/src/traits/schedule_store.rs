use async_trait::async_trait;

use crate::{models::ScheduleEntry, DawisResult};

/// 调度存储抽象接口
///
/// 调度条目的唯一变更面。文件实现采用临时文件+重命名的原子替换，
/// 写入中途崩溃不会破坏已持久化的状态。
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// 加载全部调度条目，保持插入顺序
    ///
    /// 存储不可读时返回 `StoreUnavailable`。
    async fn load(&self) -> DawisResult<Vec<ScheduleEntry>>;

    /// 原子替换全部调度条目
    ///
    /// 目录不可写时返回 `StoreUnavailable`，调用方应视为致命错误。
    async fn save(&self, entries: &[ScheduleEntry]) -> DawisResult<()>;
}
