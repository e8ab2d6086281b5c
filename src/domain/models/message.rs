// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::argument::{serialize_args, serialize_kwargs, ArgValue};

/// 消息编解码错误
#[derive(Error, Debug)]
pub enum MessageError {
    /// 编码失败
    #[error("Failed to encode message: {0}")]
    Encode(serde_json::Error),
    /// 解码失败
    #[error("Failed to decode message: {0}")]
    Decode(serde_json::Error),
}

/// 代理消息
///
/// 外部任务队列代理提交的一个工作单元。字段顺序即编码顺序，
/// 编码为紧凑JSON后整体保存在任务记录中，以便之后解码查看详情。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// 来源队列
    pub queue_name: String,
    /// 处理者名称
    pub actor_name: String,
    /// 位置参数
    #[serde(default)]
    pub args: Vec<ArgValue>,
    /// 关键字参数
    #[serde(default)]
    pub kwargs: BTreeMap<String, ArgValue>,
    /// 代理选项，可能包含 `eta`（毫秒时间戳）与 `traceback`
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
    /// 消息唯一标识符
    pub message_id: Uuid,
    /// 消息创建时间（Unix 毫秒）
    pub message_timestamp: i64,
}

impl Message {
    /// 创建一条新消息，分配新的ID与当前时间戳
    pub fn new(
        queue_name: impl Into<String>,
        actor_name: impl Into<String>,
        args: Vec<ArgValue>,
        kwargs: BTreeMap<String, ArgValue>,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            actor_name: actor_name.into(),
            args,
            kwargs,
            options: serde_json::Map::new(),
            message_id: Uuid::new_v4(),
            message_timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// 设置一个代理选项
    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// 编码为紧凑JSON字节
    pub fn encode(&self) -> Result<Vec<u8>, MessageError> {
        serde_json::to_vec(self).map_err(MessageError::Encode)
    }

    /// 从字节解码消息
    pub fn decode(data: &[u8]) -> Result<Self, MessageError> {
        serde_json::from_slice(data).map_err(MessageError::Decode)
    }

    /// 计划执行时间
    ///
    /// 优先使用延迟后的 `eta` 选项，否则回退到消息时间戳。
    pub fn eta(&self) -> Option<DateTime<Utc>> {
        let millis = self
            .options
            .get("eta")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(self.message_timestamp);
        DateTime::from_timestamp_millis(millis)
    }

    /// 代理捕获的异常堆栈
    pub fn traceback(&self) -> Option<&str> {
        self.options
            .get("traceback")
            .and_then(serde_json::Value::as_str)
    }

    pub fn serialized_args(&self) -> Option<String> {
        serialize_args(&self.args)
    }

    pub fn serialized_kwargs(&self) -> Option<String> {
        serialize_kwargs(&self.kwargs)
    }

    /// 以四空格缩进输出完整消息
    pub fn to_pretty_json(&self) -> Result<String, MessageError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)
            .map_err(MessageError::Encode)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl fmt::Display for Message {
    /// 形如 `actor(1, "a", key=true)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params: Vec<String> = self
            .args
            .iter()
            .map(|arg| serde_json::to_string(arg).unwrap_or_else(|_| "?".to_string()))
            .collect();
        params.extend(self.kwargs.iter().map(|(key, value)| {
            format!(
                "{}={}",
                key,
                serde_json::to_string(value).unwrap_or_else(|_| "?".to_string())
            )
        }));
        write!(f, "{}({})", self.actor_name, params.join(", "))
    }
}
