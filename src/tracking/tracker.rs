// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::TrackerSettings;
use crate::domain::models::message::Message;
use crate::domain::models::task::{TaskStatus, TaskWrite};
use crate::domain::repositories::task_repository::TaskRepository;
use crate::infrastructure::observability::process_memory::SysinfoMemoryProbe;
use crate::tracking::measurement::{Measurement, MeasurementError, MemoryProbe};
use crate::tracking::middleware::{Middleware, ProcessOutcome};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// 本机主机名，进程内只解析一次
static HOSTNAME: Lazy<String> = Lazy::new(|| {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
});

/// 任务生命周期跟踪器
///
/// 把代理的入队、开始、完成和跳过事件写入任务仓库。
/// 所有处理函数都不会向代理返回错误：存储失败记录日志后丢弃本次写入，
/// 度量缺失或不匹配时以空的耗时和内存写入。
pub struct TaskTracker<R> {
    repository: R,
    hostname: String,
    memory_probe: Option<Arc<dyn MemoryProbe>>,
}

impl<R> TaskTracker<R> {
    pub fn new(repository: R, settings: &TrackerSettings) -> Self {
        let memory_probe: Option<Arc<dyn MemoryProbe>> = if settings.measure_memory {
            Some(Arc::new(SysinfoMemoryProbe::new()))
        } else {
            None
        };

        Self {
            repository,
            hostname: settings
                .worker_hostname
                .clone()
                .unwrap_or_else(|| HOSTNAME.clone()),
            memory_probe,
        }
    }

    /// 替换内存探针
    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.memory_probe = Some(probe);
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    fn probe(&self) -> Option<&dyn MemoryProbe> {
        self.memory_probe.as_deref()
    }
}

impl<R: TaskRepository> TaskTracker<R> {
    /// 消息入队
    ///
    /// 带有非零延迟时记为 `delayed`，否则为 `enqueued`。
    pub async fn on_enqueue(&self, message: &Message, delay: Option<Duration>) {
        let status = match delay {
            Some(d) if !d.is_zero() => TaskStatus::Delayed,
            _ => TaskStatus::Enqueued,
        };

        self.write(TaskWrite::from_message(message, status)).await;
    }

    /// 消息开始处理，返回本次执行的度量令牌
    pub async fn on_process_start(&self, message: &Message) -> Measurement {
        let write = TaskWrite::from_message(message, TaskStatus::Running)
            .with_worker_hostname(self.hostname.clone());
        self.write(write).await;

        Measurement::begin(message.message_id, self.probe())
    }

    /// 消息处理结束
    pub async fn on_process_finish(
        &self,
        message: &Message,
        outcome: &ProcessOutcome,
        measurement: Option<Measurement>,
    ) {
        let status = if outcome.is_failure() {
            TaskStatus::Failed
        } else {
            TaskStatus::Done
        };

        self.finish(message, status, measurement).await;
    }

    /// 消息被跳过
    ///
    /// 已是 `done` 或 `failed` 的任务不会被改写为 `skipped`。
    pub async fn on_skip(&self, message: &Message, measurement: Option<Measurement>) {
        self.finish(message, TaskStatus::Skipped, measurement).await;
    }

    async fn finish(
        &self,
        message: &Message,
        status: TaskStatus,
        measurement: Option<Measurement>,
    ) {
        let settled = match measurement {
            Some(m) => m.finish(message.message_id, self.probe()),
            None => Err(MeasurementError::Missing(message.message_id)),
        };

        let metrics = settled.unwrap_or_else(|e| {
            error!(
                message_id = %message.message_id,
                actor_name = %message.actor_name,
                error = %e,
                "Execution measurement unavailable, storing task without runtime"
            );
            Default::default()
        });

        let write = TaskWrite::from_message(message, status).with_metrics(metrics);

        if status == TaskStatus::Skipped {
            match self.repository.upsert_unless_terminal(&write).await {
                Ok(true) => debug!(message_id = %message.message_id, "Task marked as skipped"),
                Ok(false) => info!(
                    message_id = %message.message_id,
                    "Skip ignored for task that already finished"
                ),
                Err(e) => error!(message_id = %message.message_id, error = %e, "Failed to record skipped task"),
            }
        } else {
            self.write(write).await;
        }
    }

    async fn write(&self, write: TaskWrite) {
        let (id, status) = (write.id, write.status);
        match self.repository.upsert(&write).await {
            Ok(()) => debug!(message_id = %id, status = %status, "Task state recorded"),
            Err(e) => error!(
                message_id = %id,
                status = %status,
                error = %e,
                "Failed to record task state"
            ),
        }
    }
}

#[async_trait]
impl<R: TaskRepository + 'static> Middleware for TaskTracker<R> {
    fn name(&self) -> &'static str {
        "task_tracker"
    }

    async fn after_enqueue(&self, message: &Message, delay: Option<Duration>) {
        self.on_enqueue(message, delay).await;
    }

    async fn before_process_message(&self, message: &Message) -> Option<Measurement> {
        Some(self.on_process_start(message).await)
    }

    async fn after_process_message(
        &self,
        message: &Message,
        outcome: &ProcessOutcome,
        measurement: Option<Measurement>,
    ) {
        self.on_process_finish(message, outcome, measurement).await;
    }

    async fn after_skip_message(&self, message: &Message, measurement: Option<Measurement>) {
        self.on_skip(message, measurement).await;
    }
}
