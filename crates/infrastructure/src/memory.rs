use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use dawis_core::{Broker, DawisError, DawisResult, TaskInvocation};

/// 内存消息代理实现
///
/// 使用进程内队列，适用于嵌入式部署与集成测试。
/// Beat与Worker共享同一实例时构成完整的调度链路。
#[derive(Default)]
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, VecDeque<TaskInvocation>>>,
    notify: Notify,
    fail_publishes: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入发布故障，模拟代理不可达（测试用）
    pub fn inject_publish_failure(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }

    /// 当前队列中的消息数量
    pub async fn queue_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn publish(&self, queue: &str, invocation: &TaskInvocation) -> DawisResult<()> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(DawisError::BrokerUnreachable(
                "注入的发布故障".to_string(),
            ));
        }

        self.queues
            .lock()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(invocation.clone());
        self.notify.notify_waiters();

        debug!("任务 {} 已入队 {}", invocation.task, queue);
        Ok(())
    }

    async fn poll(&self, queue: &str, timeout: Duration) -> DawisResult<Option<TaskInvocation>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // 先注册通知再检查队列，避免错过入队信号
            let notified = self.notify.notified();

            if let Some(invocation) = self
                .queues
                .lock()
                .await
                .get_mut(queue)
                .and_then(|q| q.pop_front())
            {
                return Ok(Some(invocation));
            }

            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_then_poll() {
        let broker = InMemoryBroker::new();
        let invocation = TaskInvocation::new("noop", json!({}));

        broker.publish("tasks", &invocation).await.unwrap();
        assert_eq!(broker.queue_len("tasks").await, 1);

        let polled = broker
            .poll("tasks", Duration::from_millis(100))
            .await
            .unwrap()
            .expect("应取到一条任务");
        assert_eq!(polled.id, invocation.id);
        assert_eq!(broker.queue_len("tasks").await, 0);
    }

    #[tokio::test]
    async fn test_poll_empty_queue_returns_none_after_timeout() {
        let broker = InMemoryBroker::new();

        let start = std::time::Instant::now();
        let polled = broker.poll("tasks", Duration::from_millis(50)).await.unwrap();

        assert!(polled.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_poll_preserves_fifo_order() {
        let broker = InMemoryBroker::new();
        let first = TaskInvocation::new("first", json!({}));
        let second = TaskInvocation::new("second", json!({}));

        broker.publish("tasks", &first).await.unwrap();
        broker.publish("tasks", &second).await.unwrap();

        let a = broker.poll("tasks", Duration::from_millis(10)).await.unwrap().unwrap();
        let b = broker.poll("tasks", Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(a.task, "first");
        assert_eq!(b.task, "second");
    }

    #[tokio::test]
    async fn test_injected_publish_failure() {
        let broker = InMemoryBroker::new();
        broker.inject_publish_failure(true);

        let result = broker
            .publish("tasks", &TaskInvocation::new("noop", json!({})))
            .await;
        assert!(matches!(result, Err(DawisError::BrokerUnreachable(_))));

        broker.inject_publish_failure(false);
        assert!(broker
            .publish("tasks", &TaskInvocation::new("noop", json!({})))
            .await
            .is_ok());
    }
}
