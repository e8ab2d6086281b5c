// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::task::{TaskRecord, TaskStatus, TaskWrite};
use crate::domain::repositories::task_repository::{
    RepositoryError, TaskFacets, TaskQueryParams, TaskRepository,
};
use crate::infrastructure::database::entities::task as task_entity;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr, OnConflict, SimpleExpr},
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// 构造忽略大小写的子串匹配模式，转义 `\\`、`%` 与 `_`
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn icontains(column: task_entity::Column, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((task_entity::Entity, column))))
        .like(LikeExpr::new(pattern).escape('\\'))
}

/// 任务仓库实现
///
/// 基于SeaORM实现的任务数据访问层。写入通过 `INSERT .. ON CONFLICT`
/// 以任务ID为键完成，重复投递同一事件不会产生新行。
#[derive(Clone)]
pub struct TaskRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl TaskRepositoryImpl {
    /// 创建新的任务仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 构建插入用的活动模型以及冲突时需要更新的列
    fn prepare(
        write: &TaskWrite,
        now: DateTime<FixedOffset>,
    ) -> (task_entity::ActiveModel, Vec<task_entity::Column>) {
        let mut columns = vec![
            task_entity::Column::Status,
            task_entity::Column::UpdatedAt,
            task_entity::Column::MessageData,
            task_entity::Column::ActorName,
            task_entity::Column::QueueName,
            task_entity::Column::Args,
            task_entity::Column::Kwargs,
        ];

        let mut model = task_entity::ActiveModel {
            id: Set(write.id),
            status: Set(write.status.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            message_data: Set(write.message_data.clone()),
            actor_name: Set(Some(write.actor_name.clone())),
            queue_name: Set(Some(write.queue_name.clone())),
            runtime: NotSet,
            worker_hostname: NotSet,
            args: Set(write.args.clone()),
            kwargs: Set(write.kwargs.clone()),
            memory_delta: NotSet,
        };

        if let Some(hostname) = &write.worker_hostname {
            model.worker_hostname = Set(Some(hostname.clone()));
            columns.push(task_entity::Column::WorkerHostname);
        }

        if let Some(metrics) = write.metrics {
            model.runtime = Set(metrics.runtime);
            model.memory_delta = Set(metrics.memory_delta);
            columns.push(task_entity::Column::Runtime);
            columns.push(task_entity::Column::MemoryDelta);
        }

        (model, columns)
    }
}

/// 统一转换为UTC偏移，保证不同来源的时间戳可以直接比较
fn normalize(ts: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    ts.with_timezone(&Utc).fixed_offset()
}

impl From<task_entity::Model> for TaskRecord {
    fn from(model: task_entity::Model) -> Self {
        Self {
            id: model.id,
            status: model.status.parse().unwrap_or_default(),
            created_at: model.created_at,
            updated_at: model.updated_at,
            message_data: model.message_data,
            actor_name: model.actor_name,
            queue_name: model.queue_name,
            runtime: model.runtime,
            worker_hostname: model.worker_hostname,
            args: model.args,
            kwargs: model.kwargs,
            memory_delta: model.memory_delta,
        }
    }
}

#[async_trait]
impl TaskRepository for TaskRepositoryImpl {
    async fn upsert(&self, write: &TaskWrite) -> Result<(), RepositoryError> {
        let (model, columns) = Self::prepare(write, Utc::now().fixed_offset());

        task_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(task_entity::Column::Id)
                    .update_columns(columns)
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn upsert_unless_terminal(&self, write: &TaskWrite) -> Result<bool, RepositoryError> {
        let now = Utc::now().fixed_offset();
        let (model, columns) = Self::prepare(write, now);
        let terminal: Vec<&str> = TaskStatus::TERMINAL.iter().map(|s| s.as_str()).collect();

        let affected = task_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(task_entity::Column::Id)
                    .update_columns(columns)
                    .action_and_where(
                        Expr::col((task_entity::Entity, task_entity::Column::Status))
                            .is_not_in(terminal),
                    )
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        if affected > 0 {
            return Ok(true);
        }

        // 终态保持不变，只记录这次事件发生的时间
        debug!(task_id = %write.id, "Task already finished, touching updated_at only");
        task_entity::Entity::update_many()
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Id.eq(write.id))
            .exec(self.db.as_ref())
            .await?;

        Ok(false)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TaskRecord>, RepositoryError> {
        let model = task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn query_tasks(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<TaskRecord>, u64), RepositoryError> {
        let mut query = task_entity::Entity::find();

        if let Some(status) = params.status {
            query = query.filter(task_entity::Column::Status.eq(status.to_string()));
        }

        if let Some(queue_name) = params.queue_name {
            query = query.filter(task_entity::Column::QueueName.eq(queue_name));
        }

        if let Some(actor_name) = params.actor_name {
            query = query.filter(task_entity::Column::ActorName.eq(actor_name));
        }

        if let Some(hostname) = params.worker_hostname {
            query = query.filter(task_entity::Column::WorkerHostname.eq(hostname));
        }

        if let Some(after) = params.created_after {
            query = query.filter(task_entity::Column::CreatedAt.gte(normalize(after)));
        }

        if let Some(before) = params.created_before {
            query = query.filter(task_entity::Column::CreatedAt.lt(normalize(before)));
        }

        if let Some(term) = params.search.filter(|s| !s.trim().is_empty()) {
            let pattern = contains_pattern(term.trim());
            query = query.filter(
                Condition::any()
                    .add(icontains(task_entity::Column::ActorName, &pattern))
                    .add(icontains(task_entity::Column::Args, &pattern))
                    .add(icontains(task_entity::Column::Kwargs, &pattern)),
            );
        }

        let total = query.clone().count(self.db.as_ref()).await?;

        let models = query
            .order_by_desc(task_entity::Column::UpdatedAt)
            .limit(params.limit as u64)
            .offset(params.offset as u64)
            .all(self.db.as_ref())
            .await?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn facets(&self) -> Result<TaskFacets, RepositoryError> {
        Ok(TaskFacets {
            queue_names: self.distinct_values(task_entity::Column::QueueName).await?,
            actor_names: self.distinct_values(task_entity::Column::ActorName).await?,
            worker_hostnames: self
                .distinct_values(task_entity::Column::WorkerHostname)
                .await?,
        })
    }

    async fn delete_old_tasks(&self, max_task_age_seconds: u64) -> Result<u64, RepositoryError> {
        let secs = i64::try_from(max_task_age_seconds)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        let age = Duration::seconds(secs);
        let threshold = Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
            .fixed_offset();

        let result = task_entity::Entity::delete_many()
            .filter(task_entity::Column::CreatedAt.lte(threshold))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}

impl TaskRepositoryImpl {
    async fn distinct_values(
        &self,
        column: task_entity::Column,
    ) -> Result<Vec<String>, RepositoryError> {
        let values = task_entity::Entity::find()
            .select_only()
            .column(column)
            .distinct()
            .filter(column.is_not_null())
            .order_by_asc(column)
            .into_tuple::<Option<String>>()
            .all(self.db.as_ref())
            .await?;

        Ok(values.into_iter().flatten().collect())
    }
}
