use async_trait::async_trait;

use crate::{
    models::{TaskInvocation, TaskResult},
    DawisResult,
};

/// 任务处理器执行上下文
///
/// 向处理器传递外部数据存储的连接能力。存储本身是外部协作者，
/// 核心只负责把连接串递进去。
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    /// 文档存储连接串
    pub document_store_url: String,
    /// 关系存储连接串
    pub relational_store_url: String,
}

/// 任务处理器接口
///
/// 业务逻辑的接缝。处理器返回的错误在工作循环边界被捕获并记录，
/// 永远不会让循环崩溃。
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// 处理器名称，与 `TaskInvocation::task` 匹配
    fn name(&self) -> &str;

    /// 执行一次任务调用
    async fn run(&self, ctx: &HandlerContext, invocation: &TaskInvocation)
        -> DawisResult<TaskResult>;
}
