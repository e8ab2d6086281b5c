// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::dto::task_query_request::{
    decode_message, TaskDetailDto, TaskFiltersDto, TaskListQueryDto, TaskListResponseDto,
    TaskRowDto,
};
use crate::config::settings::Settings;
use crate::domain::models::message::Message;
use crate::domain::models::task::{TaskRecord, TaskStatus};
use crate::domain::repositories::result_backend::ResultBackend;
use crate::domain::repositories::task_repository::{RepositoryError, TaskRepository};
use crate::presentation::errors::AppError;
use crate::utils::humanize::clip_chars;
use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

/// 结果视图的最大字符数
const RESULT_MAX_CHARS: usize = 2000;

/// 任务列表处理器
///
/// 支持状态、队列、处理者、主机名和创建时间过滤，以及关键字搜索。
pub async fn list_tasks<T: TaskRepository>(
    Extension(task_repo): Extension<Arc<T>>,
    Query(request): Query<TaskListQueryDto>,
) -> Result<Json<TaskListResponseDto>, AppError> {
    request.validate()?;

    let now = Utc::now();
    let params = request.to_params(now);
    let (limit, offset) = (params.limit, params.offset);

    let (records, total) = task_repo.query_tasks(params).await?;
    let has_more = (offset as u64) + (records.len() as u64) < total;

    Ok(Json(TaskListResponseDto {
        tasks: records
            .iter()
            .map(|record| TaskRowDto::from_record(record, now))
            .collect(),
        total,
        has_more,
        limit,
        offset,
    }))
}

/// 过滤面板可选值处理器
pub async fn task_filters<T: TaskRepository>(
    Extension(task_repo): Extension<Arc<T>>,
) -> Result<Json<TaskFiltersDto>, AppError> {
    let facets = task_repo.facets().await?;
    Ok(Json(facets.into()))
}

/// 任务详情处理器
pub async fn get_task<T: TaskRepository>(
    Extension(task_repo): Extension<Arc<T>>,
    Extension(result_backend): Extension<Arc<dyn ResultBackend>>,
    Extension(settings): Extension<Arc<Settings>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskDetailDto>, AppError> {
    let record = task_repo
        .find_by_id(id)
        .await?
        .ok_or(RepositoryError::NotFound)?;

    let message = decode_message(&record);
    let result = result_view(
        &record,
        message.as_ref(),
        result_backend.as_ref(),
        settings.results.fetch_timeout(),
    )
    .await;

    Ok(Json(TaskDetailDto {
        row: TaskRowDto::from_parts(&record, message.as_ref(), Utc::now()),
        message_details: message.as_ref().and_then(|m| m.to_pretty_json().ok()),
        traceback: message
            .as_ref()
            .and_then(|m| m.traceback())
            .map(str::to_string),
        result,
        args: record.args.clone(),
        kwargs: record.kwargs.clone(),
        memory_delta_kb: record.memory_delta.map(|bytes| bytes / 1024),
    }))
}

/// 结果视图
///
/// 只有完成的任务才会读取结果；读取失败时直接展示错误文本。
async fn result_view(
    record: &TaskRecord,
    message: Option<&Message>,
    backend: &dyn ResultBackend,
    timeout: Duration,
) -> String {
    if record.status != TaskStatus::Done {
        return String::new();
    }

    let Some(message) = message else {
        return "stored message cannot be decoded".to_string();
    };

    match backend.get_result(message, timeout).await {
        Ok(serde_json::Value::Null) => "None".to_string(),
        Ok(serde_json::Value::String(text)) => clip_chars(&text, RESULT_MAX_CHARS).to_string(),
        Ok(value) => clip_chars(&value.to_string(), RESULT_MAX_CHARS).to_string(),
        Err(e) => e.to_string(),
    }
}
