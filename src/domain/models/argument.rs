// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use tracing::warn;

/// 任务参数值
///
/// 调用方传给处理者的参数。序列化时十进制数按IEEE浮点输出，
/// 日期时间按ISO-8601字符串输出，其余按常规JSON输出。
/// 解码后日期时间会变为字符串，十进制数会变为浮点数。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ArgValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<FixedOffset>),
    Str(String),
    List(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ArgValue::Null => serializer.serialize_unit(),
            ArgValue::Bool(b) => serializer.serialize_bool(*b),
            ArgValue::Int(i) => serializer.serialize_i64(*i),
            ArgValue::Float(f) => serializer.serialize_f64(*f),
            // 超出 f64 表示范围的十进制数降级为 null
            ArgValue::Decimal(d) => match d.to_f64() {
                Some(f) => serializer.serialize_f64(f),
                None => serializer.serialize_unit(),
            },
            ArgValue::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            ArgValue::Time(t) => serializer.collect_str(&t.format(time_format(t.nanosecond()))),
            ArgValue::DateTime(dt) => serializer.collect_str(&format_args!(
                "{}T{}",
                dt.format("%Y-%m-%d"),
                dt.format(time_format(dt.nanosecond()))
            )),
            ArgValue::DateTimeTz(dt) => serializer.collect_str(&format_args!(
                "{}T{}{}",
                dt.format("%Y-%m-%d"),
                dt.format(time_format(dt.nanosecond())),
                dt.format("%:z")
            )),
            ArgValue::Str(s) => serializer.serialize_str(s),
            ArgValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ArgValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// 时间部分格式：有微秒时固定六位小数，否则省略小数
fn time_format(nanosecond: u32) -> &'static str {
    if nanosecond / 1_000 % 1_000_000 == 0 {
        "%H:%M:%S"
    } else {
        "%H:%M:%S%.6f"
    }
}

impl<'de> Deserialize<'de> for ArgValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(ArgValue::from)
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ArgValue::Null,
            serde_json::Value::Bool(b) => ArgValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => ArgValue::Int(i),
                None => ArgValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => ArgValue::Str(s),
            serde_json::Value::Array(items) => {
                ArgValue::List(items.into_iter().map(ArgValue::from).collect())
            }
            serde_json::Value::Object(entries) => ArgValue::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, ArgValue::from(value)))
                    .collect(),
            ),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ArgValue {
                fn from(value: $ty) -> Self {
                    ArgValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f64 => Float,
    Decimal => Decimal,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeTz,
    String => Str,
    &str => Str,
}

impl From<DateTime<Utc>> for ArgValue {
    fn from(value: DateTime<Utc>) -> Self {
        ArgValue::DateTimeTz(value.fixed_offset())
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(values: Vec<T>) -> Self {
        ArgValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ArgValue::Null)
    }
}

/// 序列化位置参数，空参数返回 `None`
///
/// 键只能是字符串，非有限浮点数输出为 null，因此编码不会失败。
pub fn serialize_args(args: &[ArgValue]) -> Option<String> {
    if args.is_empty() {
        return None;
    }

    serde_json::to_string(args)
        .inspect_err(|e| warn!(error = %e, "Failed to serialize args"))
        .ok()
}

/// 序列化关键字参数
///
/// 键按字典序输出，保证编码稳定，便于搜索与展示。
pub fn serialize_kwargs(kwargs: &BTreeMap<String, ArgValue>) -> Option<String> {
    if kwargs.is_empty() {
        return None;
    }

    serde_json::to_string(kwargs)
        .inspect_err(|e| warn!(error = %e, "Failed to serialize kwargs"))
        .ok()
}
