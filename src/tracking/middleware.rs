// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::Message;
use crate::tracking::measurement::Measurement;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use uuid::Uuid;

/// 一次执行的结果
#[derive(Debug, Clone, Default)]
pub struct ProcessOutcome {
    /// 处理者返回值
    pub result: Option<serde_json::Value>,
    /// 处理者抛出的异常描述
    pub exception: Option<String>,
}

impl ProcessOutcome {
    pub fn success(result: Option<serde_json::Value>) -> Self {
        Self {
            result,
            exception: None,
        }
    }

    pub fn failure(exception: impl Into<String>) -> Self {
        Self {
            result: None,
            exception: Some(exception.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.exception.is_some()
    }
}

/// 代理中间件
///
/// 代理在消息生命周期的各个节点调用这些钩子。所有钩子默认不做任何事，
/// 实现者只需覆盖关心的部分。钩子不返回错误。
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 中间件名称，用于日志
    fn name(&self) -> &'static str;

    /// 消息入队之后
    async fn after_enqueue(&self, _message: &Message, _delay: Option<Duration>) {}

    /// 消息开始处理之前，可返回一个度量令牌
    async fn before_process_message(&self, _message: &Message) -> Option<Measurement> {
        None
    }

    /// 消息处理完成之后，收回自己的度量令牌
    async fn after_process_message(
        &self,
        _message: &Message,
        _outcome: &ProcessOutcome,
        _measurement: Option<Measurement>,
    ) {
    }

    /// 消息被跳过之后，收回自己的度量令牌
    async fn after_skip_message(&self, _message: &Message, _measurement: Option<Measurement>) {}
}

/// 一次执行期间各中间件持有的令牌
///
/// 由 [`MiddlewareStack::before_process_message`] 创建，
/// 必须交还给同一个栈的结束或跳过调用。
#[derive(Debug)]
pub struct ExecutionScope {
    message_id: Uuid,
    tokens: Vec<Option<Measurement>>,
}

impl ExecutionScope {
    pub fn message_id(&self) -> Uuid {
        self.message_id
    }
}

/// 按注册顺序分发代理事件的中间件栈
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个中间件
    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub async fn after_enqueue(&self, message: &Message, delay: Option<Duration>) {
        for middleware in &self.middlewares {
            trace!(middleware = middleware.name(), message_id = %message.message_id, "after_enqueue");
            middleware.after_enqueue(message, delay).await;
        }
    }

    pub async fn before_process_message(&self, message: &Message) -> ExecutionScope {
        let mut tokens = Vec::with_capacity(self.middlewares.len());
        for middleware in &self.middlewares {
            trace!(middleware = middleware.name(), message_id = %message.message_id, "before_process_message");
            tokens.push(middleware.before_process_message(message).await);
        }

        ExecutionScope {
            message_id: message.message_id,
            tokens,
        }
    }

    pub async fn after_process_message(
        &self,
        scope: ExecutionScope,
        message: &Message,
        outcome: &ProcessOutcome,
    ) {
        for (middleware, token) in self.middlewares.iter().zip(Self::tokens(scope)) {
            trace!(middleware = middleware.name(), message_id = %message.message_id, "after_process_message");
            middleware
                .after_process_message(message, outcome, token)
                .await;
        }
    }

    pub async fn after_skip_message(&self, scope: ExecutionScope, message: &Message) {
        for (middleware, token) in self.middlewares.iter().zip(Self::tokens(scope)) {
            trace!(middleware = middleware.name(), message_id = %message.message_id, "after_skip_message");
            middleware.after_skip_message(message, token).await;
        }
    }

    fn tokens(scope: ExecutionScope) -> impl Iterator<Item = Option<Measurement>> {
        scope
            .tokens
            .into_iter()
            .chain(std::iter::repeat_with(|| None))
    }
}
