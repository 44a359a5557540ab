use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use dawis_core::{Broker, DawisResult, HandlerContext, TaskInvocation, TaskResult};
use dawis_infrastructure::HeartbeatFile;

use crate::executors::HandlerRegistry;

/// Worker服务构建器
pub struct WorkerServiceBuilder {
    worker_id: String,
    broker: Arc<dyn Broker>,
    task_queue: String,
    heartbeat: HeartbeatFile,
    handlers: Arc<HandlerRegistry>,
    context: HandlerContext,
    poll_timeout: Duration,
}

impl WorkerServiceBuilder {
    pub fn new(
        worker_id: String,
        broker: Arc<dyn Broker>,
        task_queue: String,
        heartbeat: HeartbeatFile,
    ) -> Self {
        Self {
            worker_id,
            broker,
            task_queue,
            heartbeat,
            handlers: Arc::new(HandlerRegistry::new()),
            context: HandlerContext::default(),
            poll_timeout: Duration::from_secs(5),
        }
    }

    pub fn handlers(mut self, handlers: Arc<HandlerRegistry>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn context(mut self, context: HandlerContext) -> Self {
        self.context = context;
        self
    }

    pub fn poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn build(self) -> WorkerService {
        WorkerService {
            worker_id: self.worker_id,
            broker: self.broker,
            task_queue: self.task_queue,
            heartbeat: self.heartbeat,
            handlers: self.handlers,
            context: self.context,
            poll_timeout: self.poll_timeout,
        }
    }
}

/// Worker服务
///
/// 单个执行循环: 有界超时拉取 → 执行处理器 → 记录结果，
/// 每个周期结束刷新一次心跳，包括没有任务的空闲周期——
/// 没有任务本身就是存活证明，Watchdog绝不能把"空闲"误判为"卡死"。
pub struct WorkerService {
    worker_id: String,
    broker: Arc<dyn Broker>,
    task_queue: String,
    heartbeat: HeartbeatFile,
    handlers: Arc<HandlerRegistry>,
    context: HandlerContext,
    poll_timeout: Duration,
}

impl WorkerService {
    pub fn builder(
        worker_id: String,
        broker: Arc<dyn Broker>,
        task_queue: String,
        heartbeat: HeartbeatFile,
    ) -> WorkerServiceBuilder {
        WorkerServiceBuilder::new(worker_id, broker, task_queue, heartbeat)
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// 执行一次工作循环
    ///
    /// 返回本周期的执行结果；空闲周期返回 None。
    pub async fn run_cycle(&self) -> Option<TaskResult> {
        let outcome = match self.broker.poll(&self.task_queue, self.poll_timeout).await {
            Ok(Some(invocation)) => Some(self.execute(invocation).await),
            Ok(None) => None,
            Err(e) => {
                // 代理不可达不代表Worker卡死，循环继续、心跳照常
                warn!("Worker {} 拉取任务失败: {}", self.worker_id, e);
                None
            }
        };

        if let Err(e) = self.heartbeat.touch() {
            error!("Worker {} 刷新心跳失败: {}", self.worker_id, e);
        }

        outcome
    }

    /// 执行单个任务调用
    ///
    /// 处理器在独立任务中运行，错误与panic都被隔离在工作循环
    /// 边界：崩溃的循环会停掉心跳并触发Watchdog强制重启，而底层
    /// 任务失败往往是良性且可重试的。
    async fn execute(&self, invocation: TaskInvocation) -> TaskResult {
        let start = std::time::Instant::now();

        let Some(handler) = self.handlers.get(&invocation.task) else {
            error!("未注册的任务处理器: {}", invocation.task);
            let mut result =
                TaskResult::failure(format!("未注册的任务处理器: {}", invocation.task));
            result.duration_ms = start.elapsed().as_millis() as u64;
            return result;
        };

        let context = self.context.clone();
        let task_invocation = invocation.clone();
        let joined =
            tokio::spawn(async move { handler.run(&context, &task_invocation).await }).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let mut result = match joined {
            Ok(Ok(result)) => {
                info!(
                    "任务 {} ({}) 执行完成，耗时 {}ms",
                    invocation.task, invocation.id, duration_ms
                );
                result
            }
            Ok(Err(e)) => {
                error!("任务 {} ({}) 执行失败: {}", invocation.task, invocation.id, e);
                TaskResult::failure(e.to_string())
            }
            Err(e) => {
                error!("任务 {} ({}) 异常中止: {}", invocation.task, invocation.id, e);
                TaskResult::failure(format!("任务异常中止: {e}"))
            }
        };
        result.duration_ms = duration_ms;
        result
    }

    /// 运行工作循环直至收到关闭信号
    ///
    /// 关闭在两个周期之间生效：进行中的任务先执行完，有界的拉取
    /// 超时保证关闭不会被无限期阻塞。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> DawisResult<()> {
        info!(
            "Worker {} 开始消费队列 {}，心跳文件 {}",
            self.worker_id,
            self.task_queue,
            self.heartbeat.path().display()
        );

        loop {
            match shutdown_rx.try_recv() {
                Err(broadcast::error::TryRecvError::Empty) => {}
                _ => {
                    info!("Worker {} 收到关闭信号", self.worker_id);
                    break;
                }
            }

            self.run_cycle().await;
        }

        info!("Worker {} 已停止", self.worker_id);
        Ok(())
    }
}

/// Worker池
///
/// 多个相互独立的并行执行循环；每个成员有自己的代理连接和
/// 自己的心跳文件，一个卡死成员的过期心跳不会被健康同伴掩盖。
pub struct WorkerPool {
    workers: Vec<Arc<WorkerService>>,
}

impl WorkerPool {
    pub fn new(workers: Vec<Arc<WorkerService>>) -> Self {
        Self { workers }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// 并行运行全部工作循环，直至它们全部退出
    pub async fn run(&self, shutdown_rxs: Vec<broadcast::Receiver<()>>) -> DawisResult<()> {
        let mut handles = Vec::new();

        for (worker, shutdown_rx) in self.workers.iter().zip(shutdown_rxs) {
            let worker = Arc::clone(worker);
            handles.push(tokio::spawn(async move { worker.run(shutdown_rx).await }));
        }

        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("工作循环以错误退出: {}", e),
                Err(e) => error!("工作循环异常中止: {}", e),
            }
        }

        Ok(())
    }
}
