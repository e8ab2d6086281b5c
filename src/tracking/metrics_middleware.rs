// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::Message;
use crate::domain::models::task::TaskStatus;
use crate::tracking::measurement::Measurement;
use crate::tracking::middleware::{Middleware, ProcessOutcome};
use async_trait::async_trait;
use metrics::{counter, histogram};
use std::time::Duration;
use tracing::warn;

pub const MESSAGES_ENQUEUED: &str = "tasktrail_messages_enqueued_total";
pub const MESSAGES_PROCESSED: &str = "tasktrail_messages_processed_total";
pub const MESSAGE_RUNTIME: &str = "tasktrail_message_runtime_seconds";

/// 按生命周期事件计数的指标中间件
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    fn record_processed(
        &self,
        message: &Message,
        status: TaskStatus,
        measurement: Option<Measurement>,
    ) {
        counter!(
            MESSAGES_PROCESSED,
            "queue" => message.queue_name.clone(),
            "actor" => message.actor_name.clone(),
            "status" => status.as_str()
        )
        .increment(1);

        let Some(measurement) = measurement else {
            return;
        };

        match measurement.finish(message.message_id, None) {
            Ok(metrics) => {
                if let Some(runtime) = metrics.runtime {
                    histogram!(
                        MESSAGE_RUNTIME,
                        "queue" => message.queue_name.clone(),
                        "actor" => message.actor_name.clone()
                    )
                    .record(runtime);
                }
            }
            Err(e) => warn!(message_id = %message.message_id, error = %e, "Runtime not recorded"),
        }
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    fn name(&self) -> &'static str {
        "metrics"
    }

    async fn after_enqueue(&self, message: &Message, delay: Option<Duration>) {
        let delayed = delay.is_some_and(|d| !d.is_zero());
        counter!(
            MESSAGES_ENQUEUED,
            "queue" => message.queue_name.clone(),
            "actor" => message.actor_name.clone(),
            "delayed" => if delayed { "true" } else { "false" }
        )
        .increment(1);
    }

    async fn before_process_message(&self, message: &Message) -> Option<Measurement> {
        Some(Measurement::begin(message.message_id, None))
    }

    async fn after_process_message(
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
        self.record_processed(message, status, measurement);
    }

    async fn after_skip_message(&self, message: &Message, measurement: Option<Measurement>) {
        self.record_processed(message, TaskStatus::Skipped, measurement);
    }
}
