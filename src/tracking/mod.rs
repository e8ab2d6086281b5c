// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 生命周期跟踪模块
///
/// 接收代理的消息事件并把任务状态、耗时与内存变化写入任务仓库。
///
/// 包含的子模块：
/// - 度量（measurement）：开始与结束之间传递的度量令牌
/// - 中间件（middleware）：中间件特质与按顺序分发事件的中间件栈
/// - 指标中间件（metrics_middleware）：Prometheus 计数
/// - 跟踪器（tracker）：四个生命周期处理函数
pub mod measurement;
pub mod metrics_middleware;
pub mod middleware;
pub mod tracker;

use crate::config::settings::TrackerSettings;
use crate::domain::repositories::task_repository::TaskRepository;
use metrics_middleware::MetricsMiddleware;
use middleware::MiddlewareStack;
use std::sync::Arc;
use tracker::TaskTracker;

/// 构建默认中间件栈：先跟踪器，后指标
pub fn default_stack<R>(repository: R, settings: &TrackerSettings) -> MiddlewareStack
where
    R: TaskRepository + 'static,
{
    MiddlewareStack::new()
        .with(Arc::new(TaskTracker::new(repository, settings)))
        .with(Arc::new(MetricsMiddleware))
}
