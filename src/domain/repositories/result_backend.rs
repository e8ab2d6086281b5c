// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::Message;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 结果读取错误
#[derive(Error, Debug)]
pub enum ResultError {
    /// 结果不存在或已过期
    #[error("result is missing")]
    Missing,
    /// 在限定时间内未取得结果
    #[error("timed out after {0:?} waiting for result")]
    Timeout(Duration),
    /// 没有配置结果后端
    #[error("result backend is not configured")]
    NotConfigured,
    /// 后端返回的其他错误
    #[error("result backend error: {0}")]
    Backend(String),
}

/// 结果后端特质
///
/// 只读地获取任务的异步执行结果，供详情视图展示。
#[async_trait]
pub trait ResultBackend: Send + Sync {
    async fn get_result(
        &self,
        message: &Message,
        timeout: Duration,
    ) -> Result<serde_json::Value, ResultError>;
}

/// 未配置结果后端时使用的实现
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResultBackend;

#[async_trait]
impl ResultBackend for NoResultBackend {
    async fn get_result(
        &self,
        _message: &Message,
        _timeout: Duration,
    ) -> Result<serde_json::Value, ResultError> {
        Err(ResultError::NotConfigured)
    }
}
