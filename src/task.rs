use std::fmt;

use chrono::NaiveDateTime;
use log::warn;

use crate::log_entry::LogEntry;

/// `#`を取り除いたタグの文字列。
///
/// タグ同士は文字列として比較し、小文字化するのは`meeting`の判定時のみ。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag(String);

/// タグの種類。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    /// 正の整数で表されるwork item番号。
    WorkItem(u64),
    /// 大文字小文字を区別しない`meeting`。
    Meeting,
    /// それ以外のタグ。集計と送信の対象外。
    Other,
}

impl Tag {
    /// `#`で始まるトークンをタグにする。`#`だけのトークンはタグとみなさない。
    pub fn parse(token: &str) -> Option<Self> {
        token
            .strip_prefix('#')
            .filter(|text| !text.is_empty())
            .map(|text| Self(text.to_string()))
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> TagKind {
        match self.0.parse::<u64>() {
            Ok(number) if number > 0 => TagKind::WorkItem(number),
            _ if self.0.eq_ignore_ascii_case("meeting") => TagKind::Meeting,
            _ => TagKind::Other,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// タグ付きの1行から作られるタスクの記録。
#[derive(Clone, Debug, PartialEq)]
pub struct TaskRecord {
    pub tag: Tag,
    pub description: String,
    /// 直前の行からの経過時間(分)。
    pub duration_minutes: i64,
}

/// タグごとの`TaskRecord`の一覧。
///
/// タグは最初に出現した順、記録はログの順に並ぶ。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskCollection {
    groups: Vec<(Tag, Vec<TaskRecord>)>,
}

impl TaskCollection {
    pub fn push(&mut self, record: TaskRecord) {
        match self.groups.iter_mut().find(|(tag, _)| *tag == record.tag) {
            Some((_, records)) => records.push(record),
            None => self.groups.push((record.tag.clone(), vec![record])),
        }
    }

    /// 指定したタグ(`#`なし)の記録を返す。
    #[cfg(test)]
    pub fn get(&self, tag: &str) -> Option<&[TaskRecord]> {
        self.groups
            .iter()
            .find(|(key, _)| key.as_str() == tag)
            .map(|(_, records)| records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &[TaskRecord])> {
        self.groups
            .iter()
            .map(|(tag, records)| (tag, records.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// ログの行から`TaskCollection`を作る。
///
/// 各行の経過時間は直前の行の時刻からの差分とし、どちらかの時刻が無い場合は0分とする。
/// 1行に複数のタグがある場合は最初のタグだけを使う。
pub fn collect_tasks(entries: &[LogEntry]) -> TaskCollection {
    let mut collection = TaskCollection::default();
    let mut previous: Option<NaiveDateTime> = None;

    for entry in entries {
        let duration_minutes = match (previous, entry.timestamp) {
            (Some(previous), Some(current)) => elapsed_minutes(previous, current),
            _ => 0,
        };
        previous = entry.timestamp;

        let (token, tag) = match entry
            .content
            .split_whitespace()
            .find_map(|word| Tag::parse(word).map(|tag| (word, tag)))
        {
            Some(found) => found,
            None => continue,
        };
        if duration_minutes < 0 {
            warn!(
                "Timestamps go backwards at {:?}, duration is {} minutes",
                entry.content, duration_minutes
            );
        }

        collection.push(TaskRecord {
            tag,
            description: entry.content.replacen(token, "", 1).trim().to_string(),
            duration_minutes,
        });
    }

    collection
}

/// 2つの時刻の差を分単位で切り捨てて返す。
fn elapsed_minutes(previous: NaiveDateTime, current: NaiveDateTime) -> i64 {
    (current - previous).num_milliseconds().div_euclid(60_000)
}
