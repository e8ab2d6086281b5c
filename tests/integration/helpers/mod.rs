// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, DbErr};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tasktrail::config::settings::TrackerSettings;
use tasktrail::domain::models::argument::ArgValue;
use tasktrail::domain::models::message::Message;
use tasktrail::domain::models::task::{TaskRecord, TaskWrite};
use tasktrail::domain::repositories::task_repository::{
    RepositoryError, TaskFacets, TaskQueryParams, TaskRepository,
};
use tasktrail::domain::repositories::result_backend::{ResultBackend, ResultError};
use tasktrail::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use tasktrail::tracking::measurement::MemoryProbe;
use tasktrail::tracking::tracker::TaskTracker;
use uuid::Uuid;

/// 创建已执行迁移的内存数据库
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(db);
    Migrator::up(db.as_ref(), None).await.unwrap();
    db
}

pub async fn setup_repo() -> (Arc<DatabaseConnection>, Arc<TaskRepositoryImpl>) {
    let db = setup_db().await;
    let repo = Arc::new(TaskRepositoryImpl::new(db.clone()));
    (db, repo)
}

pub fn tracker_settings() -> TrackerSettings {
    TrackerSettings {
        worker_hostname: Some("worker-test-1".to_string()),
        measure_memory: false,
    }
}

pub fn tracker(repo: Arc<TaskRepositoryImpl>) -> TaskTracker<Arc<TaskRepositoryImpl>> {
    TaskTracker::new(repo, &tracker_settings())
}

pub fn message(actor: &str) -> Message {
    Message::new(
        "default",
        actor,
        vec![ArgValue::from(42), ArgValue::from("weekly")],
        BTreeMap::from([("dry_run".to_string(), ArgValue::from(true))]),
    )
}

/// 可手动设置读数的内存探针
#[derive(Default)]
pub struct ScriptedProbe {
    bytes: AtomicU64,
}

impl ScriptedProbe {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: AtomicU64::new(bytes),
        }
    }

    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::SeqCst);
    }
}

impl MemoryProbe for ScriptedProbe {
    fn resident_bytes(&self) -> Option<u64> {
        Some(self.bytes.load(Ordering::SeqCst))
    }
}

/// 固定返回值的结果后端
pub struct StaticResultBackend(pub serde_json::Value);

#[async_trait]
impl ResultBackend for StaticResultBackend {
    async fn get_result(
        &self,
        _message: &Message,
        _timeout: Duration,
    ) -> Result<serde_json::Value, ResultError> {
        Ok(self.0.clone())
    }
}

/// 永远等不到结果的后端，模拟超时
pub struct SlowResultBackend;

#[async_trait]
impl ResultBackend for SlowResultBackend {
    async fn get_result(
        &self,
        _message: &Message,
        timeout: Duration,
    ) -> Result<serde_json::Value, ResultError> {
        tokio::time::timeout(timeout, std::future::pending::<()>())
            .await
            .map_err(|_| ResultError::Timeout(timeout))?;
        Ok(serde_json::Value::Null)
    }
}

/// 所有操作都返回数据库错误的仓库，记录写入尝试次数
#[derive(Default)]
pub struct FailingRepository {
    pub writes: AtomicUsize,
}

impl FailingRepository {
    fn unavailable() -> RepositoryError {
        RepositoryError::Database(DbErr::Custom("store unavailable".to_string()))
    }
}

#[async_trait]
impl TaskRepository for FailingRepository {
    async fn upsert(&self, _write: &TaskWrite) -> Result<(), RepositoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn upsert_unless_terminal(&self, _write: &TaskWrite) -> Result<bool, RepositoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<TaskRecord>, RepositoryError> {
        Err(Self::unavailable())
    }

    async fn query_tasks(
        &self,
        _params: TaskQueryParams,
    ) -> Result<(Vec<TaskRecord>, u64), RepositoryError> {
        Err(Self::unavailable())
    }

    async fn facets(&self) -> Result<TaskFacets, RepositoryError> {
        Err(Self::unavailable())
    }

    async fn delete_old_tasks(&self, _max_task_age_seconds: u64) -> Result<u64, RepositoryError> {
        Err(Self::unavailable())
    }
}
