//! 调度链路集成测试：Beat → 消息代理 → Worker → 心跳

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use tempfile::TempDir;

use dawis_beat::BeatScheduler;
use dawis_core::{
    Broker, DawisResult, HandlerContext, ScheduleEntry, ScheduleStore, StorageConfig, TaskHandler,
    TaskInvocation, TaskResult,
};
use dawis_infrastructure::{FileScheduleStore, HeartbeatFile, InMemoryBroker, MaintenanceSentinel};
use dawis_watchdog::{Liveness, LivenessProbe};
use dawis_worker::{HandlerRegistry, WorkerService};

const EVERY_MINUTE: &str = "0 * * * * *";
const TASK_QUEUE: &str = "dawis_tasks";

/// 记录每次调用的处理器
struct RecordingHandler {
    name: String,
    calls: AtomicUsize,
}

impl RecordingHandler {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TaskHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        _ctx: &HandlerContext,
        _invocation: &TaskInvocation,
    ) -> DawisResult<TaskResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TaskResult::success(None))
    }
}

fn due_entry(id: i64, task: &str) -> ScheduleEntry {
    let mut entry = ScheduleEntry::new(id, task, task, EVERY_MINUTE)
        .with_payload(json!({"source": "integration"}));
    entry.next_due_at = Some(Utc::now() - ChronoDuration::seconds(1));
    entry
}

fn worker_for(
    dir: &TempDir,
    broker: Arc<InMemoryBroker>,
    handler: Arc<RecordingHandler>,
) -> WorkerService {
    let mut registry = HandlerRegistry::new();
    registry.register(handler);

    WorkerService::builder(
        "worker-001".to_string(),
        broker,
        TASK_QUEUE.to_string(),
        HeartbeatFile::new(dir.path().join("worker-001.heartbeat")),
    )
    .handlers(Arc::new(registry))
    .context(HandlerContext {
        document_store_url: "mongodb://localhost:27017/dawis".to_string(),
        relational_store_url: "mysql://dawis@localhost:3306/dawis".to_string(),
    })
    .poll_timeout(Duration::from_millis(50))
    .build()
}

#[tokio::test]
async fn test_due_entry_flows_from_beat_to_worker() {
    let dir = TempDir::new().unwrap();
    let broker = Arc::new(InMemoryBroker::new());
    let store = Arc::new(FileScheduleStore::new(dir.path().join("schedule.json")));
    store.save(&[due_entry(1, "aggregation.google_pagespeed")]).await.unwrap();

    // Beat发布到期任务
    let scheduler = BeatScheduler::new(store.clone(), broker.clone(), TASK_QUEUE.to_string());
    let now = Utc::now();
    assert_eq!(scheduler.tick(now).await.unwrap(), 1);
    assert_eq!(broker.queue_len(TASK_QUEUE).await, 1);

    // Worker消费并执行
    let handler = Arc::new(RecordingHandler::new("aggregation.google_pagespeed"));
    let worker = worker_for(&dir, broker.clone(), handler.clone());
    let outcome = worker.run_cycle().await.expect("应有执行结果");

    assert!(outcome.success);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(broker.queue_len(TASK_QUEUE).await, 0);

    // 调度存储反映推进后的状态
    let reloaded = store.load().await.unwrap();
    assert_eq!(reloaded[0].last_run_at, Some(now));
    assert!(reloaded[0].next_due_at.unwrap() > now);
}

#[tokio::test]
async fn test_worker_heartbeat_keeps_watchdog_healthy() {
    let dir = TempDir::new().unwrap();
    let broker = Arc::new(InMemoryBroker::new());
    let handler = Arc::new(RecordingHandler::new("noop"));
    let worker = worker_for(&dir, broker, handler);

    // 初始化完成：放置哨兵（Worker启动路径的职责）
    MaintenanceSentinel::new(dir.path().join("delete_me_for_restart"))
        .place()
        .unwrap();

    // 几个空闲周期
    for _ in 0..3 {
        assert!(worker.run_cycle().await.is_none());
    }

    let storage = StorageConfig {
        schedule_dir: dir.path().display().to_string(),
        runtime_dir: dir.path().display().to_string(),
    };
    let probe = LivenessProbe::new(&storage, Duration::from_secs(300));

    // 空闲轮询照常刷新心跳，看门狗不会把"空闲"误判为"卡死"
    assert_eq!(probe.check(Utc::now()), Liveness::Healthy);

    // 同一心跳在阈值之外就是不健康
    assert_eq!(
        probe.check(Utc::now() + ChronoDuration::seconds(350)),
        Liveness::Unhealthy
    );
}

#[tokio::test]
async fn test_publish_failure_retries_on_next_tick_end_to_end() {
    let dir = TempDir::new().unwrap();
    let broker = Arc::new(InMemoryBroker::new());
    let store = Arc::new(FileScheduleStore::new(dir.path().join("schedule.json")));
    store.save(&[due_entry(1, "noop")]).await.unwrap();

    let scheduler = BeatScheduler::new(store.clone(), broker.clone(), TASK_QUEUE.to_string());

    // 代理不可达的tick：条目原样保留
    broker.inject_publish_failure(true);
    assert_eq!(scheduler.tick(Utc::now()).await.unwrap(), 0);
    assert_eq!(broker.queue_len(TASK_QUEUE).await, 0);
    assert!(store.load().await.unwrap()[0].last_run_at.is_none());

    // 代理恢复后下个tick补发（至少一次语义）
    broker.inject_publish_failure(false);
    assert_eq!(scheduler.tick(Utc::now()).await.unwrap(), 1);
    assert_eq!(broker.queue_len(TASK_QUEUE).await, 1);
}

#[tokio::test]
async fn test_two_due_entries_published_in_insertion_order() {
    let dir = TempDir::new().unwrap();
    let broker = Arc::new(InMemoryBroker::new());
    let store = Arc::new(FileScheduleStore::new(dir.path().join("schedule.json")));
    store
        .save(&[due_entry(1, "task-a"), due_entry(2, "task-b")])
        .await
        .unwrap();

    let scheduler = BeatScheduler::new(store, broker.clone(), TASK_QUEUE.to_string());
    assert_eq!(scheduler.tick(Utc::now()).await.unwrap(), 2);

    // 队列中的顺序即插入顺序
    let first = broker
        .poll(TASK_QUEUE, Duration::from_millis(10))
        .await
        .unwrap()
        .unwrap();
    let second = broker
        .poll(TASK_QUEUE, Duration::from_millis(10))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.task, "task-a");
    assert_eq!(second.task, "task-b");
}

#[tokio::test]
async fn test_crash_restart_recovers_without_backlog_amplification() {
    let dir = TempDir::new().unwrap();
    let broker = Arc::new(InMemoryBroker::new());
    let schedule_path = dir.path().join("schedule.json");

    {
        // 模拟崩溃前的进程：条目的到期时间停在很久之前
        let store = Arc::new(FileScheduleStore::new(&schedule_path));
        let mut entry = ScheduleEntry::new(1, "积压", "noop", EVERY_MINUTE);
        entry.next_due_at = Some(Utc::now() - ChronoDuration::days(3));
        store.save(&[entry]).await.unwrap();
    }

    // 重启后的第一个tick：恰好补发一次
    let store = Arc::new(FileScheduleStore::new(&schedule_path));
    let scheduler = BeatScheduler::new(store.clone(), broker.clone(), TASK_QUEUE.to_string());
    let now = Utc::now();
    assert_eq!(scheduler.tick(now).await.unwrap(), 1);
    assert_eq!(broker.queue_len(TASK_QUEUE).await, 1);

    // 之后的tick不再补发
    assert_eq!(scheduler.tick(now + ChronoDuration::seconds(2)).await.unwrap(), 0);
    assert_eq!(broker.queue_len(TASK_QUEUE).await, 1);
}
