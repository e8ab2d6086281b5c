// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{TaskRecord, TaskStatus, TaskWrite};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::DbErr;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 任务查询参数
#[derive(Debug, Default, Clone)]
pub struct TaskQueryParams {
    pub status: Option<TaskStatus>,
    pub queue_name: Option<String>,
    pub actor_name: Option<String>,
    pub worker_hostname: Option<String>,
    pub created_after: Option<DateTime<FixedOffset>>,
    pub created_before: Option<DateTime<FixedOffset>>,
    /// 在处理者名称和序列化参数中做子串搜索
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// 过滤面板可选值
#[derive(Debug, Default, Clone, Serialize)]
pub struct TaskFacets {
    pub queue_names: Vec<String>,
    pub actor_names: Vec<String>,
    pub worker_hostnames: Vec<String>,
}

/// 任务仓库特质
///
/// 定义任务记录的数据访问接口。所有写入都以任务ID为幂等键。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 插入或更新任务记录，只更新写入携带的列
    async fn upsert(&self, write: &TaskWrite) -> Result<(), RepositoryError>;
    /// 条件写入：已存状态为 Done 或 Failed 时不覆盖，仅刷新更新时间
    ///
    /// 返回写入是否生效
    async fn upsert_unless_terminal(&self, write: &TaskWrite) -> Result<bool, RepositoryError>;
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskRecord>, RepositoryError>;
    /// 过滤、搜索并分页查询任务，按更新时间倒序
    async fn query_tasks(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<TaskRecord>, u64), RepositoryError>;
    /// 获取队列、处理者和主机名的去重列表
    async fn facets(&self) -> Result<TaskFacets, RepositoryError>;
    /// 删除创建时间早于 `max_task_age_seconds` 秒之前的任务
    async fn delete_old_tasks(&self, max_task_age_seconds: u64) -> Result<u64, RepositoryError>;
}

#[async_trait]
impl<T: TaskRepository + ?Sized> TaskRepository for Arc<T> {
    async fn upsert(&self, write: &TaskWrite) -> Result<(), RepositoryError> {
        (**self).upsert(write).await
    }

    async fn upsert_unless_terminal(&self, write: &TaskWrite) -> Result<bool, RepositoryError> {
        (**self).upsert_unless_terminal(write).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskRecord>, RepositoryError> {
        (**self).find_by_id(id).await
    }

    async fn query_tasks(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<TaskRecord>, u64), RepositoryError> {
        (**self).query_tasks(params).await
    }

    async fn facets(&self) -> Result<TaskFacets, RepositoryError> {
        (**self).facets().await
    }

    async fn delete_old_tasks(&self, max_task_age_seconds: u64) -> Result<u64, RepositoryError> {
        (**self).delete_old_tasks(max_task_age_seconds).await
    }
}
