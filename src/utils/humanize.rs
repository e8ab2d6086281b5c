// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// 列表摘要的最大字符数
pub const SUMMARY_MAX_CHARS: usize = 150;

/// 展示用的耗时文本
///
/// 小于1秒时保留到第一个有效数字，小于10秒保留一位小数，
/// 其余取整（银行家舍入）。
pub fn runtime_display(runtime: f64) -> String {
    if !runtime.is_finite() || runtime <= 0.0 {
        return "0 sec".to_string();
    }

    if runtime < 1.0 {
        let places = (runtime.log10().abs().trunc() as u32 + 1).min(28);
        return format!("{} sec", round_half_even(runtime, places));
    }

    if runtime < 10.0 {
        return format!("{} sec", round_half_even(runtime, 1));
    }

    format!("{} sec", runtime.round_ties_even() as i64)
}

/// 按二进制精确值做银行家舍入并输出定长小数
fn round_half_even(value: f64, places: u32) -> String {
    match Decimal::from_f64_retain(value) {
        Some(exact) => {
            let rounded =
                exact.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven);
            format!("{:.*}", places as usize, rounded)
        }
        None => format!("{:.*}", places as usize, value),
    }
}

/// 相对时间描述
///
/// 一分钟内为 `now`；30天内为 `N minutes ago` / `in N days` 形式；
/// 更远的时间输出日期。
pub fn natural_date(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(at);
    let seconds = delta.num_seconds();
    let magnitude = seconds.unsigned_abs();

    if magnitude < 60 {
        return "now".to_string();
    }

    let (count, unit) = if magnitude < 3_600 {
        (magnitude / 60, "minute")
    } else if magnitude < 86_400 {
        (magnitude / 3_600, "hour")
    } else if magnitude <= 30 * 86_400 {
        (magnitude / 86_400, "day")
    } else {
        return at.format("%Y-%m-%d").to_string();
    };

    let plural = if count == 1 { "" } else { "s" };
    if seconds > 0 {
        format!("{} {}{} ago", count, unit, plural)
    } else {
        format!("in {} {}{}", count, unit, plural)
    }
}

/// 截断过长文本，超出部分以 `..` 结尾
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}..", &text[..idx]),
        None => text.to_string(),
    }
}

/// 截断文本但不追加后缀
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
