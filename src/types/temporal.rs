//! 日期时间类型的编解码
//!
//! 统一使用 RFC 3339 风格的文本格式，微秒固定 6 位，时区偏移形如
//! `Z` 或 `+09:00`。naive 类型解码时丢弃时区标注、保留钟面读数；
//! [`TzDateTime`] 内部一律换算成 UTC 存储。

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::errors::{RedmapError, Result};
use crate::types::{BulkType, impl_value_type_for_bulk};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const DATETIME_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const TIME_FORMAT: &str = "%H:%M:%S%.6f";
const TIME_PARSE_FORMAT: &str = "%H:%M:%S%.f";

/// `chrono::NaiveDate`，存成 `2012-03-28`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Date;

impl BulkType for Date {
    type Value = NaiveDate;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        Ok(value.format(DATE_FORMAT).to_string().into_bytes())
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        let text = std::str::from_utf8(bulk)?;
        Ok(NaiveDate::parse_from_str(text, DATE_FORMAT)?)
    }
}

/// `chrono::NaiveDateTime`，存成 `2012-03-28T09:21:34.638972`
///
/// 带时区标注的串也能解码，时区被丢弃、钟面读数保留。需要保留时区
/// 的场合用 [`TzDateTime`]。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateTime;

impl BulkType for DateTime {
    type Value = NaiveDateTime;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        Ok(value.format(DATETIME_FORMAT).to_string().into_bytes())
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        let text = std::str::from_utf8(bulk)?;
        let clock = strip_zone_suffix(text);
        Ok(NaiveDateTime::parse_from_str(clock, DATETIME_PARSE_FORMAT)?)
    }
}

/// `chrono::DateTime<Utc>`，存成 `2012-03-28T09:21:34.638972Z`
///
/// 编码时一律换算到 UTC。解码要求输入带时区偏移，否则是解码错误。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TzDateTime;

impl BulkType for TzDateTime {
    type Value = chrono::DateTime<Utc>;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        Ok(value
            .format("%Y-%m-%dT%H:%M:%S%.6fZ")
            .to_string()
            .into_bytes())
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        let text = std::str::from_utf8(bulk)?;
        let parsed = chrono::DateTime::parse_from_rfc3339(text).map_err(|e| {
            RedmapError::decoding(format!(
                "expected an RFC 3339 datetime with a zone offset, got {:?}: {}",
                text, e
            ))
        })?;
        Ok(parsed.with_timezone(&Utc))
    }
}

/// `chrono::NaiveTime`，存成 `09:21:34.638972`；时区标注在解码时丢弃
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Time;

impl BulkType for Time {
    type Value = NaiveTime;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        Ok(value.format(TIME_FORMAT).to_string().into_bytes())
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        let text = std::str::from_utf8(bulk)?;
        let clock = strip_zone_suffix(text);
        Ok(NaiveTime::parse_from_str(clock, TIME_PARSE_FORMAT)?)
    }
}

/// `chrono::TimeDelta`，存成 `days,seconds,microseconds`，例如
/// `3,53,123123`。只接受非负时长。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeDelta;

impl BulkType for TimeDelta {
    type Value = chrono::TimeDelta;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        if *value < chrono::TimeDelta::zero() {
            return Err(RedmapError::encoding(
                "negative durations are not representable",
            ));
        }
        let days = value.num_days();
        let rem = *value - chrono::TimeDelta::days(days);
        let seconds = rem.num_seconds();
        let micros = (rem - chrono::TimeDelta::seconds(seconds))
            .num_microseconds()
            .unwrap_or(0);
        Ok(format!("{},{},{}", days, seconds, micros).into_bytes())
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        let text = std::str::from_utf8(bulk)?;
        let mut parts = text.split(',');
        let (days, seconds, micros) = match (parts.next(), parts.next(), parts.next(), parts.next())
        {
            (Some(d), Some(s), Some(m), None) => (
                d.parse::<u64>().map_err(bad_duration(text))?,
                s.parse::<u64>().map_err(bad_duration(text))?,
                m.parse::<u64>().map_err(bad_duration(text))?,
            ),
            _ => {
                return Err(RedmapError::decoding(format!(
                    "expected 'days,seconds,microseconds', got {:?}",
                    text
                )));
            }
        };
        if micros >= 1_000_000 {
            return Err(RedmapError::decoding(format!(
                "microsecond part out of range in {:?}",
                text
            )));
        }
        let duration = chrono::TimeDelta::try_days(days as i64)
            .and_then(|d| {
                chrono::TimeDelta::try_seconds(seconds as i64).and_then(|s| d.checked_add(&s))
            })
            .and_then(|ds| ds.checked_add(&chrono::TimeDelta::microseconds(micros as i64)))
            .ok_or_else(|| {
                RedmapError::decoding(format!("duration out of range: {:?}", text))
            })?;
        Ok(duration)
    }
}

fn bad_duration(text: &str) -> impl Fn(std::num::ParseIntError) -> RedmapError + '_ {
    move |e| RedmapError::decoding(format!("malformed duration {:?}: {}", text, e))
}

/// 去掉末尾的 `Z` 或 `+HH:MM` / `-HH:MM` 时区标注
fn strip_zone_suffix(text: &str) -> &str {
    if let Some(stripped) = text.strip_suffix('Z') {
        return stripped;
    }
    let bytes = text.as_bytes();
    if bytes.len() >= 6 {
        let tail = &bytes[bytes.len() - 6..];
        if (tail[0] == b'+' || tail[0] == b'-')
            && tail[1].is_ascii_digit()
            && tail[2].is_ascii_digit()
            && tail[3] == b':'
            && tail[4].is_ascii_digit()
            && tail[5].is_ascii_digit()
        {
            return &text[..text.len() - 6];
        }
    }
    text
}

impl_value_type_for_bulk!(Date, DateTime, TzDateTime, Time, TimeDelta);
