// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod task;

use crate::config::settings::Settings;
use crate::domain::repositories::result_backend::ResultBackend;
use crate::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use axum::{routing::get, Extension, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由，依赖的仓库、结果后端与配置通过 `Extension` 注入
pub fn routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version))
        .merge(task::task_routes())
}

/// 创建注入了全部依赖的应用
pub fn app(
    task_repo: Arc<TaskRepositoryImpl>,
    result_backend: Arc<dyn ResultBackend>,
    settings: Arc<Settings>,
) -> Router {
    routes()
        .layer(Extension(task_repo))
        .layer(Extension(result_backend))
        .layer(Extension(settings))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
