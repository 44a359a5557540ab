use std::time::Duration;

use async_trait::async_trait;

use crate::{models::TaskInvocation, DawisResult};

/// 消息代理抽象接口
///
/// 连接参数在启动时一次性给定；实现持有单个长连接，
/// 传输故障时以有界指数退避重连，绝不无限阻塞发布路径。
#[async_trait]
pub trait Broker: Send + Sync {
    /// 发布任务调用到指定队列
    ///
    /// 在有界重试预算耗尽后快速失败，返回 `BrokerUnreachable`，
    /// 以免拖住调度tick。
    async fn publish(&self, queue: &str, invocation: &TaskInvocation) -> DawisResult<()>;

    /// 在限定超时内从队列拉取一条任务调用
    ///
    /// 返回 `None` 表示没有任务，这本身不构成错误。
    async fn poll(&self, queue: &str, timeout: Duration) -> DawisResult<Option<TaskInvocation>>;
}
