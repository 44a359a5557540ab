use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 任务调用消息
///
/// 由Beat调度器创建并发布到消息代理，由Worker恰好消费一次
/// （代理重投递时为至少一次）。创建之后不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInvocation {
    pub id: String,
    /// 任务处理器名称
    pub task: String,
    /// 任务参数，JSON 格式
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    /// 可选路由键；缺省时按队列名路由
    pub routing_key: Option<String>,
}

impl TaskInvocation {
    pub fn new(task: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task: task.to_string(),
            payload,
            enqueued_at: Utc::now(),
            routing_key: None,
        }
    }

    pub fn with_routing_key(mut self, routing_key: String) -> Self {
        self.routing_key = Some(routing_key);
        self
    }

    pub fn serialize_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn deserialize_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// 任务执行结果
///
/// 由Worker在每次执行后记录；执行失败只体现在结果里，
/// 永远不会让工作循环崩溃。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub success: bool,
    pub output: Option<String>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

impl TaskResult {
    pub fn success(output: Option<String>) -> Self {
        Self {
            success: true,
            output,
            error_message: None,
            duration_ms: 0,
        }
    }

    pub fn failure(error_message: String) -> Self {
        Self {
            success: false,
            output: None,
            error_message: Some(error_message),
            duration_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invocation_creation() {
        let invocation = TaskInvocation::new("aggregation.google_pagespeed", json!({"apiKey": "k"}));

        assert!(!invocation.id.is_empty());
        assert_eq!(invocation.task, "aggregation.google_pagespeed");
        assert!(invocation.routing_key.is_none());
    }

    #[test]
    fn test_invocation_wire_roundtrip() {
        let original = TaskInvocation::new("noop", json!({"n": 1}))
            .with_routing_key("aggregation".to_string());

        let bytes = original.serialize_bytes().expect("serialize");
        let restored = TaskInvocation::deserialize_bytes(&bytes).expect("deserialize");

        assert_eq!(restored.id, original.id);
        assert_eq!(restored.task, original.task);
        assert_eq!(restored.payload, original.payload);
        assert_eq!(restored.routing_key.as_deref(), Some("aggregation"));
    }

    #[test]
    fn test_task_result_constructors() {
        let ok = TaskResult::success(Some("42 documents".to_string()));
        assert!(ok.success);
        assert!(ok.error_message.is_none());

        let failed = TaskResult::failure("api quota exceeded".to_string());
        assert!(!failed.success);
        assert_eq!(failed.error_message.as_deref(), Some("api quota exceeded"));
    }
}
