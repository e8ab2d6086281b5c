// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::RetentionSettings;
use crate::domain::repositories::task_repository::{RepositoryError, TaskRepository};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 任务保留清理工作器
///
/// 定期删除创建时间超过保留期限的任务记录
pub struct RetentionWorker<R>
where
    R: TaskRepository + Send + Sync + 'static,
{
    repository: Arc<R>,
    max_task_age_seconds: u64,
    interval: Duration,
}

impl<R> RetentionWorker<R>
where
    R: TaskRepository + Send + Sync + 'static,
{
    pub fn new(repository: Arc<R>, settings: &RetentionSettings) -> Self {
        Self {
            repository,
            max_task_age_seconds: settings.max_task_age_seconds,
            interval: Duration::from_secs(settings.interval_seconds.max(1)),
        }
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!(
            max_task_age_seconds = self.max_task_age_seconds,
            interval_seconds = self.interval.as_secs(),
            "Task retention worker started"
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            match self.delete_old_tasks().await {
                Ok(0) => debug!("No tasks past retention"),
                Ok(count) => info!("Deleted {} tasks past retention", count),
                Err(e) => error!("Failed to delete old tasks: {}", e),
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// 执行一次清理
    pub async fn delete_old_tasks(&self) -> Result<u64, RepositoryError> {
        self.repository
            .delete_old_tasks(self.max_task_age_seconds)
            .await
    }
}

#[cfg(test)]
#[path = "retention_worker_test.rs"]
mod tests;
