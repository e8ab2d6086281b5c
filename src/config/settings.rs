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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含数据库、服务器、生命周期跟踪、保留策略、结果后端和指标等配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 生命周期跟踪配置
    pub tracker: TrackerSettings,
    /// 任务保留配置
    pub retention: RetentionSettings,
    /// 结果后端配置
    pub results: ResultSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 生命周期跟踪配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerSettings {
    /// 覆盖自动探测的主机名
    pub worker_hostname: Option<String>,
    /// 是否记录常驻内存变化
    pub measure_memory: bool,
}

/// 任务保留配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSettings {
    /// 是否启用定期清理
    pub enabled: bool,
    /// 任务最长保留时间（秒）
    pub max_task_age_seconds: u64,
    /// 清理间隔（秒）
    pub interval_seconds: u64,
}

/// 结果后端配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ResultSettings {
    /// Redis连接URL，为空时不读取结果
    pub redis_url: Option<String>,
    /// 结果键前缀
    pub namespace: String,
    /// 读取结果的超时时间（毫秒）
    pub fetch_timeout_ms: u64,
}

impl ResultSettings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用Prometheus导出
    pub enabled: bool,
    /// 导出器监听地址
    pub listen_addr: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 以及 `TASKTRAIL__` 前缀的环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB settings
            .set_default("database.url", "sqlite://tasktrail.db?mode=rwc")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default tracker settings
            .set_default("tracker.measure_memory", true)?
            // Default retention settings
            .set_default("retention.enabled", false)?
            .set_default("retention.max_task_age_seconds", 86_400 * 30)?
            .set_default("retention.interval_seconds", 3600)?
            // Default result backend settings
            .set_default("results.namespace", "tasktrail-results")?
            .set_default("results.fetch_timeout_ms", 50)?
            // Default metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", "0.0.0.0:9000")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("TASKTRAIL").separator("__"));

        builder.build()?.try_deserialize()
    }
}
