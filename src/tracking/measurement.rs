// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::ExecutionMetrics;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

/// 常驻内存探针
pub trait MemoryProbe: Send + Sync {
    /// 当前进程的常驻内存（字节），无法读取时返回 `None`
    fn resident_bytes(&self) -> Option<u64>;
}

/// 度量错误
#[derive(Error, Debug, PartialEq)]
pub enum MeasurementError {
    /// 结束时没有对应的开始度量
    #[error("no measurement was started for message {0}")]
    Missing(Uuid),
    /// 度量属于另一条消息
    #[error("measurement belongs to message {started} but message {finished} finished")]
    Mismatch { started: Uuid, finished: Uuid },
}

/// 一次执行的度量令牌
///
/// 由开始钩子返回，由结束钩子按值消费，因此每次执行最多被结算一次。
#[derive(Debug)]
pub struct Measurement {
    message_id: Uuid,
    started: Instant,
    baseline_rss: Option<u64>,
}

impl Measurement {
    /// 以当前时刻和当前常驻内存开始度量
    pub fn begin(message_id: Uuid, probe: Option<&dyn MemoryProbe>) -> Self {
        Self {
            message_id,
            started: Instant::now(),
            baseline_rss: probe.and_then(|p| p.resident_bytes()),
        }
    }

    /// 使用给定的开始时刻与基线内存
    pub fn from_parts(message_id: Uuid, started: Instant, baseline_rss: Option<u64>) -> Self {
        Self {
            message_id,
            started,
            baseline_rss,
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    /// 结算度量
    ///
    /// 消息ID不一致时返回 [`MeasurementError::Mismatch`]。
    pub fn finish(
        self,
        message_id: Uuid,
        probe: Option<&dyn MemoryProbe>,
    ) -> Result<ExecutionMetrics, MeasurementError> {
        if self.message_id != message_id {
            return Err(MeasurementError::Mismatch {
                started: self.message_id,
                finished: message_id,
            });
        }

        let runtime = self.started.elapsed().as_secs_f64();
        let memory_delta = match (self.baseline_rss, probe.and_then(|p| p.resident_bytes())) {
            (Some(before), Some(after)) => Some(after as i64 - before as i64),
            _ => None,
        };

        Ok(ExecutionMetrics {
            runtime: Some(runtime),
            memory_delta,
        })
    }
}
