use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info};

use dawis_beat::BeatScheduler;
use dawis_core::{AppConfig, Broker, BrokerType, HandlerContext};
use dawis_infrastructure::{
    mask_amqp_url, FileScheduleStore, HeartbeatFile, InMemoryBroker, MaintenanceSentinel,
    RabbitMqBroker,
};
use dawis_worker::{HandlerRegistry, NoopHandler, WorkerPool, WorkerService};

/// 应用运行模式
#[derive(Debug, Clone)]
pub enum AppMode {
    /// 仅运行Beat调度器
    Beat,
    /// 仅运行Worker
    Worker,
    /// 运行所有组件
    All,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    broker: Arc<dyn Broker>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        let broker = create_broker(&config).await?;

        Ok(Self {
            config,
            mode,
            broker,
        })
    }

    /// 运行应用程序
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Beat => self.run_beat(shutdown_rx).await,
            AppMode::Worker => self.run_worker(shutdown_rx).await,
            AppMode::All => self.run_all_components(shutdown_rx).await,
        }
    }

    /// 运行Beat调度器模式
    async fn run_beat(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动Beat调度器");

        std::fs::create_dir_all(&self.config.storage.schedule_dir).with_context(|| {
            format!("创建调度目录失败: {}", self.config.storage.schedule_dir)
        })?;

        let store = Arc::new(FileScheduleStore::new(self.config.storage.schedule_file()));
        let scheduler = BeatScheduler::new(
            store,
            Arc::clone(&self.broker),
            self.config.broker.task_queue.clone(),
        );

        scheduler
            .run(
                Duration::from_secs(self.config.beat.tick_interval_seconds),
                shutdown_rx,
            )
            .await?;

        info!("Beat调度器已停止");
        Ok(())
    }

    /// 运行Worker模式
    async fn run_worker(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let worker_config = &self.config.worker;
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        info!(
            "启动Worker服务: {} (主机: {})",
            worker_config.worker_id, hostname
        );

        std::fs::create_dir_all(&self.config.storage.runtime_dir).with_context(|| {
            format!("创建运行时目录失败: {}", self.config.storage.runtime_dir)
        })?;

        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(NoopHandler));
        let handlers = Arc::new(registry);

        let context = HandlerContext {
            document_store_url: self.config.stores.document_url.clone(),
            relational_store_url: self.config.stores.relational_url.clone(),
        };

        let mut workers = Vec::new();
        for index in 0..worker_config.worker_count {
            // 多Worker共存时各自独立的标识与心跳文件
            let worker_id = if worker_config.worker_count == 1 {
                worker_config.worker_id.clone()
            } else {
                format!("{}-{}", worker_config.worker_id, index)
            };

            let broker = self.worker_broker().await?;
            let heartbeat = HeartbeatFile::new(self.config.storage.heartbeat_file(&worker_id));

            workers.push(Arc::new(
                WorkerService::builder(
                    worker_id,
                    broker,
                    self.config.broker.task_queue.clone(),
                    heartbeat,
                )
                .handlers(Arc::clone(&handlers))
                .context(context.clone())
                .poll_timeout(Duration::from_secs(worker_config.poll_timeout_seconds))
                .build(),
            ));
        }

        let pool = WorkerPool::new(workers);

        // 初始化完成，放置维护哨兵；此后Watchdog开始按心跳新鲜度判定
        MaintenanceSentinel::new(self.config.storage.sentinel_file()).place()?;

        let receivers = (0..pool.worker_count())
            .map(|_| shutdown_rx.resubscribe())
            .collect();
        pool.run(receivers).await?;

        info!("Worker服务已停止");
        Ok(())
    }

    /// 运行所有组件
    async fn run_all_components(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动所有组件");

        let mut handles = Vec::new();

        if self.config.beat.enabled {
            let app = self.clone_for_mode(AppMode::Beat);
            let shutdown_rx = shutdown_rx.resubscribe();

            handles.push(tokio::spawn(async move { app.run_beat(shutdown_rx).await }));
        }

        if self.config.worker.enabled {
            let app = self.clone_for_mode(AppMode::Worker);
            let shutdown_rx = shutdown_rx.resubscribe();

            handles.push(tokio::spawn(
                async move { app.run_worker(shutdown_rx).await },
            ));
        }

        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("组件运行失败: {e}");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    error!("组件异常中止: {e}");
                }
            }
        }

        info!("所有组件已停止");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// 为特定模式克隆应用实例
    fn clone_for_mode(&self, mode: AppMode) -> Self {
        Self {
            config: self.config.clone(),
            mode,
            broker: Arc::clone(&self.broker),
        }
    }

    /// 按配置为Worker建立代理连接
    ///
    /// 每个Worker循环各自持有一条连接；内存队列必须共享同一实例，
    /// 否则Beat与Worker各看各的队列。
    async fn worker_broker(&self) -> Result<Arc<dyn Broker>> {
        match self.config.broker.r#type {
            BrokerType::InMemory => Ok(Arc::clone(&self.broker)),
            BrokerType::Rabbitmq => {
                let broker = RabbitMqBroker::connect(self.config.broker.clone())
                    .await
                    .context("为Worker连接消息代理失败")?;
                Ok(Arc::new(broker))
            }
        }
    }
}

/// 创建消息代理客户端
async fn create_broker(config: &AppConfig) -> Result<Arc<dyn Broker>> {
    match config.broker.r#type {
        BrokerType::Rabbitmq => {
            info!("连接消息代理: {}", mask_amqp_url(&config.broker.url));
            let broker = RabbitMqBroker::connect(config.broker.clone())
                .await
                .context("连接消息代理失败")?;
            info!("消息代理连接成功");
            Ok(Arc::new(broker))
        }
        BrokerType::InMemory => {
            info!("使用内存消息队列（嵌入式模式）");
            Ok(Arc::new(InMemoryBroker::new()))
        }
    }
}
