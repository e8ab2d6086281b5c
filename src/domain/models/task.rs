// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use crate::domain::models::message::{Message, MessageError};

/// 任务记录
///
/// 每条代理消息对应一行记录，保存其生命周期状态、
/// 执行耗时和内存变化，供管理界面只读查询。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// 任务唯一标识符（即代理分配的消息ID）
    pub id: Uuid,
    /// 任务状态
    pub status: TaskStatus,
    /// 创建时间，仅在首次写入时设置
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间，每次写入都会刷新
    pub updated_at: DateTime<FixedOffset>,
    /// 原始编码消息
    #[serde(skip)]
    pub message_data: Vec<u8>,
    /// 处理者名称
    pub actor_name: Option<String>,
    /// 来源队列名称
    pub queue_name: Option<String>,
    /// 最近一次执行的耗时（秒）
    pub runtime: Option<f64>,
    /// 执行任务的主机名
    pub worker_hostname: Option<String>,
    /// 序列化后的位置参数
    pub args: Option<String>,
    /// 序列化后的关键字参数
    pub kwargs: Option<String>,
    /// 常驻内存变化（字节），可能为负
    pub memory_delta: Option<i64>,
}

impl TaskRecord {
    /// 解码保存的原始消息
    pub fn message(&self) -> Result<Message, MessageError> {
        Message::decode(&self.message_data)
    }
}

/// 任务状态枚举
///
/// 只有 Done 与 Failed 是受保护的终态；Skipped 是临时状态，
/// 必须让位于终态；其余状态可以被任意覆盖。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 已入队
    #[default]
    Enqueued,
    /// 延迟入队
    Delayed,
    /// 执行中
    Running,
    /// 执行失败
    Failed,
    /// 执行完成
    Done,
    /// 被跳过
    Skipped,
}

impl TaskStatus {
    /// 受保护的终态，跳过事件不能覆盖它们
    pub const TERMINAL: [TaskStatus; 2] = [TaskStatus::Done, TaskStatus::Failed];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Enqueued => "enqueued",
            TaskStatus::Delayed => "delayed",
            TaskStatus::Running => "running",
            TaskStatus::Failed => "failed",
            TaskStatus::Done => "done",
            TaskStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enqueued" => Ok(TaskStatus::Enqueued),
            "delayed" => Ok(TaskStatus::Delayed),
            "running" => Ok(TaskStatus::Running),
            "failed" => Ok(TaskStatus::Failed),
            "done" => Ok(TaskStatus::Done),
            "skipped" => Ok(TaskStatus::Skipped),
            _ => Err(()),
        }
    }
}

/// 一次执行的度量结果
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecutionMetrics {
    /// 耗时（秒）
    pub runtime: Option<f64>,
    /// 内存变化（字节）
    pub memory_delta: Option<i64>,
}

/// 生命周期钩子产生的一次写入
///
/// 只有携带的字段会被写入：`worker_hostname` 为 `None` 时保留原值，
/// `metrics` 为 `None` 时不触碰耗时与内存列。
#[derive(Debug, Clone)]
pub struct TaskWrite {
    pub id: Uuid,
    pub status: TaskStatus,
    pub message_data: Vec<u8>,
    pub actor_name: String,
    pub queue_name: String,
    pub args: Option<String>,
    pub kwargs: Option<String>,
    pub worker_hostname: Option<String>,
    pub metrics: Option<ExecutionMetrics>,
}

impl TaskWrite {
    /// 根据消息构建写入，参数会重新序列化
    pub fn from_message(message: &Message, status: TaskStatus) -> Self {
        Self {
            id: message.message_id,
            status,
            message_data: message.encode().unwrap_or_else(|e| {
                warn!(message_id = %message.message_id, error = %e, "Storing task without message payload");
                Vec::new()
            }),
            actor_name: message.actor_name.clone(),
            queue_name: message.queue_name.clone(),
            args: message.serialized_args(),
            kwargs: message.serialized_kwargs(),
            worker_hostname: None,
            metrics: None,
        }
    }

    pub fn with_worker_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.worker_hostname = Some(hostname.into());
        self
    }

    pub fn with_metrics(mut self, metrics: ExecutionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
