// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::tracking::metrics_middleware::{MESSAGES_ENQUEUED, MESSAGES_PROCESSED, MESSAGE_RUNTIME};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 启动Prometheus导出器并注册跟踪指标
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new();

    // 端口被占用时只记录警告，不影响跟踪
    if let Err(e) = builder.with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(MESSAGES_ENQUEUED, "Total number of messages enqueued");
    describe_counter!(
        MESSAGES_PROCESSED,
        "Total number of messages that finished processing, by status"
    );
    describe_histogram!(
        MESSAGE_RUNTIME,
        Unit::Seconds,
        "Wall-clock runtime of processed messages"
    );
}
