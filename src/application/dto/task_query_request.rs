// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::message::Message;
use crate::domain::models::task::{TaskRecord, TaskStatus};
use crate::domain::repositories::task_repository::{TaskFacets, TaskQueryParams};
use crate::utils::humanize::{natural_date, runtime_display, truncate_chars, SUMMARY_MAX_CHARS};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

/// 默认每页条数
pub const DEFAULT_LIMIT: u32 = 100;

/// 创建时间快捷范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CreatedRange {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "past_7_days")]
    Past7Days,
    #[serde(rename = "this_month")]
    ThisMonth,
    #[serde(rename = "this_year")]
    ThisYear,
}

impl CreatedRange {
    pub const ALL: [&'static str; 4] = ["today", "past_7_days", "this_month", "this_year"];

    /// 计算范围的 `[起点, 终点)`，按UTC日历
    pub fn bounds(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive();
        let tomorrow = today + Duration::days(1);

        let (start, end) = match self {
            CreatedRange::Today => (today, tomorrow),
            CreatedRange::Past7Days => (today - Duration::days(7), tomorrow),
            CreatedRange::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                };
                (first, next.unwrap_or(tomorrow))
            }
            CreatedRange::ThisYear => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let next = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(tomorrow);
                (first, next)
            }
        };

        (midnight(start), midnight(end))
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// 任务列表查询请求DTO
#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct TaskListQueryDto {
    /// 任务状态过滤
    pub status: Option<TaskStatus>,

    /// 队列名称过滤
    pub queue_name: Option<String>,

    /// 处理者名称过滤
    pub actor_name: Option<String>,

    /// 主机名过滤
    pub worker_hostname: Option<String>,

    /// 创建时间快捷范围
    pub created: Option<CreatedRange>,

    /// 创建时间范围过滤（开始时间）
    pub created_after: Option<DateTime<FixedOffset>>,

    /// 创建时间范围过滤（结束时间）
    pub created_before: Option<DateTime<FixedOffset>>,

    /// 在处理者名称和参数中搜索
    #[validate(length(max = 200))]
    pub q: Option<String>,

    /// 每页条数
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<u32>,

    /// 分页偏移
    pub offset: Option<u32>,
}

impl TaskListQueryDto {
    /// 转换为仓库查询参数，快捷范围与显式范围取交集
    pub fn to_params(&self, now: DateTime<Utc>) -> TaskQueryParams {
        let mut created_after = self.created_after;
        let mut created_before = self.created_before;

        if let Some(range) = self.created {
            let (start, end) = range.bounds(now);
            let (start, end) = (start.fixed_offset(), end.fixed_offset());
            created_after = Some(created_after.map_or(start, |after| after.max(start)));
            created_before = Some(created_before.map_or(end, |before| before.min(end)));
        }

        TaskQueryParams {
            status: self.status,
            queue_name: self.queue_name.clone(),
            actor_name: self.actor_name.clone(),
            worker_hostname: self.worker_hostname.clone(),
            created_after,
            created_before,
            search: self.q.clone(),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// 任务列表中的一行
#[derive(Debug, Serialize)]
pub struct TaskRowDto {
    pub id: Uuid,
    /// 消息摘要，超过150个字符时截断
    pub summary: String,
    pub status: TaskStatus,
    /// 计划执行时间的相对描述
    pub eta: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub queue_name: Option<String>,
    pub actor_name: Option<String>,
    pub runtime_display: Option<String>,
    pub worker_hostname: Option<String>,
}

impl TaskRowDto {
    pub fn from_record(record: &TaskRecord, now: DateTime<Utc>) -> Self {
        let message = decode_message(record);
        Self::from_parts(record, message.as_ref(), now)
    }

    /// 使用已解码的消息构建，解码失败时摘要退化为任务ID
    pub fn from_parts(
        record: &TaskRecord,
        message: Option<&Message>,
        now: DateTime<Utc>,
    ) -> Self {
        let summary = match message {
            Some(message) => truncate_chars(&message.to_string(), SUMMARY_MAX_CHARS),
            None => record.id.to_string(),
        };

        Self {
            id: record.id,
            summary,
            status: record.status,
            eta: message
                .and_then(|m| m.eta())
                .map(|eta| natural_date(eta, now)),
            created_at: record.created_at,
            updated_at: record.updated_at,
            queue_name: record.queue_name.clone(),
            actor_name: record.actor_name.clone(),
            runtime_display: record.runtime.map(runtime_display),
            worker_hostname: record.worker_hostname.clone(),
        }
    }
}

/// 解码记录中保存的消息，失败时记录警告
pub fn decode_message(record: &TaskRecord) -> Option<Message> {
    record
        .message()
        .map_err(|e| warn!(task_id = %record.id, error = %e, "Stored message cannot be decoded"))
        .ok()
}

/// 任务列表响应DTO
#[derive(Debug, Serialize)]
pub struct TaskListResponseDto {
    pub tasks: Vec<TaskRowDto>,
    pub total: u64,
    pub has_more: bool,
    pub limit: u32,
    pub offset: u32,
}

/// 任务详情响应DTO
#[derive(Debug, Serialize)]
pub struct TaskDetailDto {
    #[serde(flatten)]
    pub row: TaskRowDto,
    /// 四空格缩进的完整消息
    pub message_details: Option<String>,
    pub traceback: Option<String>,
    /// 执行结果，仅完成的任务才会读取
    pub result: String,
    pub args: Option<String>,
    pub kwargs: Option<String>,
    pub memory_delta_kb: Option<i64>,
}

/// 过滤面板响应DTO
#[derive(Debug, Serialize)]
pub struct TaskFiltersDto {
    pub statuses: Vec<&'static str>,
    pub created: Vec<&'static str>,
    #[serde(flatten)]
    pub facets: TaskFacets,
}

impl From<TaskFacets> for TaskFiltersDto {
    fn from(facets: TaskFacets) -> Self {
        Self {
            statuses: [
                TaskStatus::Enqueued,
                TaskStatus::Delayed,
                TaskStatus::Running,
                TaskStatus::Failed,
                TaskStatus::Done,
                TaskStatus::Skipped,
            ]
            .iter()
            .map(|s| s.as_str())
            .collect(),
            created: CreatedRange::ALL.to_vec(),
            facets,
        }
    }
}
