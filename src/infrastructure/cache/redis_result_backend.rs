// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::Message;
use crate::domain::repositories::result_backend::{ResultBackend, ResultError};
use crate::infrastructure::cache::redis_client::RedisClient;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// 基于Redis的结果后端
///
/// 结果以JSON字符串形式保存在普通键 `<namespace>:<message_id>` 下，
/// 由写入结果的一方遵循同一约定。
#[derive(Clone)]
pub struct RedisResultBackend {
    client: RedisClient,
    namespace: String,
}

impl RedisResultBackend {
    pub fn new(client: RedisClient, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// 计算消息对应的结果键
    pub fn key_for(&self, message: &Message) -> String {
        format!("{}:{}", self.namespace, message.message_id)
    }
}

#[async_trait]
impl ResultBackend for RedisResultBackend {
    async fn get_result(
        &self,
        message: &Message,
        timeout: Duration,
    ) -> Result<serde_json::Value, ResultError> {
        let key = self.key_for(message);
        debug!(key = %key, "Fetching task result");

        let raw = tokio::time::timeout(timeout, self.client.get(&key))
            .await
            .map_err(|_| ResultError::Timeout(timeout))?
            .map_err(|e| ResultError::Backend(e.to_string()))?
            .ok_or(ResultError::Missing)?;

        serde_json::from_str(&raw).map_err(|e| ResultError::Backend(e.to_string()))
    }
}
