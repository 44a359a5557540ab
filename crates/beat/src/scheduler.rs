use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use dawis_core::{Broker, DawisResult, ScheduleStore, TaskInvocation};

use crate::cron_utils::CronScheduler;

/// Beat调度器
///
/// 按固定墙钟间隔tick：扫描调度存储，把到期条目发布到消息代理，
/// 并在每次成功发布后立即原子持久化条目的新到期时间。
/// 调度存储的单写者。
pub struct BeatScheduler {
    store: Arc<dyn ScheduleStore>,
    broker: Arc<dyn Broker>,
    task_queue: String,
}

impl BeatScheduler {
    pub fn new(store: Arc<dyn ScheduleStore>, broker: Arc<dyn Broker>, task_queue: String) -> Self {
        Self {
            store,
            broker,
            task_queue,
        }
    }

    /// 执行一次调度扫描
    ///
    /// 到期判定: enabled 且 next_due_at <= now。相同到期时间的条目按
    /// 插入顺序处理；单次tick处理完所有当前到期的条目。
    ///
    /// 重启补偿是惰性的: 过期再久的条目也只立即发布一次，新的
    /// 到期时间从 now 起算，不会按错过的间隔逐个补发。
    ///
    /// 发布失败的条目保持原样，下个tick重试（至少一次语义，重复
    /// 发布由任务处理器容忍）。存储保存失败视为致命错误上抛。
    pub async fn tick(&self, now: DateTime<Utc>) -> DawisResult<usize> {
        let mut entries = self.store.load().await?;
        let mut published = 0;
        let mut initialized = false;

        for index in 0..entries.len() {
            let entry = entries[index].clone();

            if !entry.enabled {
                debug!("条目 {} 已停用，跳过调度", entry.name);
                continue;
            }

            let cron = match CronScheduler::new(&entry.schedule) {
                Ok(cron) => cron,
                Err(e) => {
                    warn!("条目 {} 的CRON表达式无效: {}", entry.name, e);
                    continue;
                }
            };

            match entry.next_due_at {
                None => {
                    // 新条目: 只初始化首次到期时间，不补发过去的执行
                    entries[index].next_due_at = cron.next_after(now);
                    initialized = true;
                    debug!(
                        "条目 {} 首次到期时间已初始化: {:?}",
                        entry.name, entries[index].next_due_at
                    );
                }
                Some(due) if due <= now => {
                    let invocation = TaskInvocation::new(&entry.task, entry.payload.clone());

                    match self.broker.publish(&self.task_queue, &invocation).await {
                        Ok(()) => {
                            entries[index].mark_published(now, cron.next_after(now));
                            // 每个条目单独原子持久化，tick中途放弃也是安全的
                            self.store.save(&entries).await?;
                            published += 1;
                            info!("已发布任务 {} (条目 {})", entry.task, entry.name);
                        }
                        Err(e) => {
                            warn!("发布任务 {} 失败，下个tick重试: {}", entry.task, e);
                        }
                    }
                }
                Some(_) => {
                    if let Some(until) = cron.time_until_next_execution(now) {
                        debug!(
                            "条目 {} 下次执行还需等待 {} 秒",
                            entry.name,
                            until.num_seconds()
                        );
                    }
                }
            }
        }

        if initialized {
            self.store.save(&entries).await?;
        }

        Ok(published)
    }

    /// 运行调度循环
    ///
    /// 单协作式定时循环，一次只有一个tick在执行；上个tick未结束时
    /// 到来的定时信号被推迟而非并发执行，调度存储写入因此天然串行。
    pub async fn run(
        &self,
        tick_interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> DawisResult<()> {
        info!(
            "Beat调度器启动，tick间隔 {} 秒，目标队列 {}",
            tick_interval.as_secs(),
            self.task_queue
        );

        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick(Utc::now()).await {
                        Ok(count) => {
                            if count > 0 {
                                info!("本次调度完成，共发布 {} 个任务", count);
                            }
                        }
                        Err(e) if e.is_fatal() => {
                            // 没有持久化状态就无法保证调度语义，终止而非带病运行
                            error!("调度存储不可用，终止调度器: {}", e);
                            return Err(e);
                        }
                        Err(e) => {
                            error!("任务调度失败: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("调度器循环收到关闭信号");
                    break;
                }
            }
        }

        Ok(())
    }
}
