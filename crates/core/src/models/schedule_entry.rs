use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 调度条目
///
/// 表示一个可周期调度的任务定义，持久化于调度存储中。
/// 条目仅由Beat调度器在成功发布之后推进，单写者，无需加锁。
///
/// # 字段说明
///
/// - `id`: 条目的唯一标识符
/// - `name`: 条目的人类可读名称
/// - `task`: 任务处理器名称，如 "aggregation.google_pagespeed"
/// - `schedule`: cron 表达式，定义任务的执行时间
/// - `payload`: 任务参数，JSON 格式
/// - `enabled`: 是否参与调度；false 的条目永远不会被选中
/// - `last_run_at`: 上次成功发布时间
/// - `next_due_at`: 下次到期时间；不变量 next_due_at >= last_run_at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub name: String,
    pub task: String,
    pub schedule: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub enabled: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_due_at: Option<DateTime<Utc>>,
}

impl ScheduleEntry {
    pub fn new(id: i64, name: &str, task: &str, schedule: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            task: task.to_string(),
            schedule: schedule.to_string(),
            payload: serde_json::Value::Null,
            enabled: true,
            last_run_at: None,
            next_due_at: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// 判断条目在给定时刻是否到期
    ///
    /// `next_due_at` 为 None 的新条目不视为到期，由调度器先初始化。
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && matches!(self.next_due_at, Some(due) if due <= now)
    }

    /// 成功发布后推进条目状态
    pub fn mark_published(&mut self, now: DateTime<Utc>, next_due: Option<DateTime<Utc>>) {
        self.last_run_at = Some(now);
        self.next_due_at = next_due;
    }
}
