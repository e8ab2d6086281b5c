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

use std::net::SocketAddr;
use std::sync::Arc;
use tasktrail::config::settings::Settings;
use tasktrail::domain::repositories::result_backend::{NoResultBackend, ResultBackend};
use tasktrail::infrastructure::cache::redis_client::RedisClient;
use tasktrail::infrastructure::cache::redis_result_backend::RedisResultBackend;
use tasktrail::infrastructure::database::connection;
use tasktrail::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use tasktrail::presentation::routes;
use tasktrail::workers::retention_worker::RetentionWorker;
use tokio::net::TcpListener;
use tracing::{info, warn};

use migration::{Migrator, MigratorTrait};
use tasktrail::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动只读管理服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting tasktrail...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    if settings.metrics.enabled {
        let addr: SocketAddr = settings.metrics.listen_addr.parse()?;
        tasktrail::infrastructure::metrics::init_metrics(addr);
    }

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Result backend
    let result_backend: Arc<dyn ResultBackend> = match &settings.results.redis_url {
        Some(url) => {
            let client = RedisClient::new(url).await?;
            info!("Redis result backend initialized");
            Arc::new(RedisResultBackend::new(
                client,
                settings.results.namespace.clone(),
            ))
        }
        None => {
            warn!("No result backend configured, task results will not be shown");
            Arc::new(NoResultBackend)
        }
    };

    let task_repo = Arc::new(TaskRepositoryImpl::new(db.clone()));

    // 5. Start retention worker
    if settings.retention.enabled {
        RetentionWorker::new(task_repo.clone(), &settings.retention).start();
    }

    // 6. Start HTTP server
    let app = routes::app(task_repo, result_backend, settings.clone());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
