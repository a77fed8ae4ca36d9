use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::debug;

/// タイムスタンプと本文を区切る文字列。
pub const SEPARATOR: &str = " - ";

/// 自動でタイムスタンプを付与する時の書式。
const TIMESTAMP_FORMAT: &str = "%I:%M %p";

/// ログの1行をパースした結果。
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    /// 当日の日付に時刻を適用した日時。パースできなかった場合は`None`。
    pub timestamp: Option<NaiveDateTime>,
    pub content: String,
}

/// `"H:MM AM/PM"`形式の文字列を指定した日付の日時に変換する。
///
/// # Arguments
///
/// * `text` - `"9:05 AM"`のような時刻の文字列
/// * `date` - 時刻を適用する日付
///
/// # Examples
///
/// ```
/// let timestamp = parse_timestamp("1:05 PM", today)?;
/// assert_eq!(timestamp.hour(), 13);
/// ```
pub fn parse_timestamp(text: &str, date: NaiveDate) -> Result<NaiveDateTime> {
    let (time, suffix) = text
        .trim()
        .split_once(' ')
        .with_context(|| format!("Missing AM/PM suffix: {:?}", text))?;
    let (hour, minute) = time
        .split_once(':')
        .with_context(|| format!("Missing ':' between hour and minute: {:?}", text))?;
    if !is_digits(hour, 1..=2) {
        bail!("Hour must be one or two digits: {:?}", text);
    }
    if !is_digits(minute, 2..=2) {
        bail!("Minute must be two digits: {:?}", text);
    }
    let hour: u32 = hour
        .parse()
        .with_context(|| format!("Failed to parse hour: {:?}", text))?;
    let minute: u32 = minute
        .parse()
        .with_context(|| format!("Failed to parse minute: {:?}", text))?;
    if !(1..=12).contains(&hour) {
        bail!("Hour must be between 1 and 12: {:?}", text);
    }

    let hour = match suffix.to_ascii_uppercase().as_str() {
        "AM" if hour == 12 => 0,
        "AM" => hour,
        "PM" if hour == 12 => 12,
        "PM" => hour + 12,
        _ => bail!("Unknown AM/PM suffix: {:?}", text),
    };
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .with_context(|| format!("Time is out of range: {:?}", text))?;

    Ok(date.and_time(time))
}

/// 指定した長さのASCII数字だけで構成されているかどうか。
fn is_digits(text: &str, len: std::ops::RangeInclusive<usize>) -> bool {
    len.contains(&text.len()) && text.bytes().all(|b| b.is_ascii_digit())
}

/// 時刻を自動付与用の`"HH:MM AM/PM"`形式の文字列にする。
pub fn format_timestamp(time: NaiveTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// 区切り文字を持たない行を、現在時刻のタイムスタンプだけを持つ行に置き換える。
///
/// 区切り文字を持つ行はそのまま残すため、付与済みのテキストに再度適用しても変化しない。
pub fn stamp_text(text: &str, now: &DateTime<Local>) -> String {
    let stamp = format!("{}{}", format_timestamp(now.time()), SEPARATOR);

    text.split('\n')
        .map(|line| {
            if line.contains(SEPARATOR) {
                line.to_string()
            } else {
                stamp.clone()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// テキスト全体を行ごとの`LogEntry`に変換する。
///
/// 区切り文字を持たない行は、現在時刻が付与された本文なしの行として扱う。
/// 2つ目以降の区切り文字より後ろは本文に含めない。
pub fn parse_log(text: &str, now: &DateTime<Local>) -> Vec<LogEntry> {
    text.split('\n').map(|line| parse_line(line, now)).collect()
}

fn parse_line(line: &str, now: &DateTime<Local>) -> LogEntry {
    let mut segments = line.split(SEPARATOR);
    let head = segments.next().unwrap_or_default();

    match segments.next() {
        None => LogEntry {
            timestamp: current_minute(now),
            content: String::new(),
        },
        Some(content) => {
            let timestamp = match parse_timestamp(head, now.date_naive()) {
                Ok(timestamp) => Some(timestamp),
                Err(err) => {
                    debug!("Ignore timestamp of line {:?}: {:#}", line, err);
                    None
                }
            };
            LogEntry {
                timestamp,
                content: content.to_string(),
            }
        }
    }
}

/// 秒以下を切り捨てた現在時刻。
fn current_minute(now: &DateTime<Local>) -> Option<NaiveDateTime> {
    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).map(|time| now.date_naive().and_time(time))
}
