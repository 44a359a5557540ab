use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use dawis_core::{DawisResult, HandlerContext, TaskHandler, TaskInvocation, TaskResult};

/// 任务处理器注册表
///
/// 按处理器名称查找，Worker在执行前解析。未注册的任务名被当作
/// 执行失败记录，不会让工作循环崩溃。
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册任务处理器
    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        let name = handler.name().to_string();
        info!("注册任务处理器: {}", name);
        self.handlers.insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// 空操作处理器
///
/// 用于验证调度链路端到端联通；真实的聚合模块作为外部协作者
/// 注册各自的处理器。
pub struct NoopHandler;

#[async_trait]
impl TaskHandler for NoopHandler {
    fn name(&self) -> &str {
        "noop"
    }

    async fn run(
        &self,
        _ctx: &HandlerContext,
        invocation: &TaskInvocation,
    ) -> DawisResult<TaskResult> {
        debug!("noop任务执行，payload: {}", invocation.payload);
        Ok(TaskResult::success(None))
    }
}
