// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::routing::get;
use axum::Router;

use crate::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use crate::presentation::handlers::task_handler;

/// 创建任务管理路由
///
/// 只注册 GET 路由，其余方法由 axum 返回 405。
pub fn task_routes() -> Router {
    Router::new()
        .route(
            "/admin/tasks",
            get(task_handler::list_tasks::<TaskRepositoryImpl>),
        )
        .route(
            "/admin/tasks/filters",
            get(task_handler::task_filters::<TaskRepositoryImpl>),
        )
        .route(
            "/admin/tasks/{id}",
            get(task_handler::get_task::<TaskRepositoryImpl>),
        )
}
