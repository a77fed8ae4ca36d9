use std::fmt::Write;

use serde::Serialize;

use crate::config::SyncConfig;
use crate::task::{Tag, TagKind, TaskCollection};

/// 丸めの単位(分)。
const ROUNDING_MINUTES: f64 = 15.0;

/// タグごとの合計時間(分)。タグは最初に出現した順に並ぶ。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryCollection {
    totals: Vec<(Tag, i64)>,
}

impl SummaryCollection {
    /// 指定したタグ(`#`なし)の合計時間を返す。
    #[cfg(test)]
    pub fn get(&self, tag: &str) -> Option<i64> {
        self.totals
            .iter()
            .find(|(key, _)| key.as_str() == tag)
            .map(|(_, minutes)| *minutes)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Tag, i64)> {
        self.totals.iter().map(|(tag, minutes)| (tag, *minutes))
    }
}

/// 外部のwork item trackerに送信するタスク。
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub parent_work_item_number: u64,
    pub task_name: String,
    /// 15分単位に丸めた時間(時間)。
    pub task_time_rounded: f64,
}

/// タグごとに経過時間を合計する。
pub fn summarize(tasks: &TaskCollection) -> SummaryCollection {
    let totals = tasks
        .iter()
        .map(|(tag, records)| {
            let minutes = records.iter().map(|record| record.duration_minutes).sum();
            (tag.clone(), minutes)
        })
        .collect();

    SummaryCollection { totals }
}

/// 集計結果を表示用の文字列にする。
///
/// work itemのタグは1行ずつ表示して合計に加え、`meeting`は会議の合計にだけ加える。
/// それ以外のタグは表示しない。
/// `config`がある場合は、work itemの行にtrackerのページへのリンクを付ける。
pub fn summary_text(summary: &SummaryCollection, config: Option<&SyncConfig>) -> String {
    let mut text = String::from("Tasks:\n");
    let mut total_task_minutes = 0;
    let mut total_meeting_minutes = 0;

    for (tag, minutes) in summary.iter() {
        match tag.kind() {
            TagKind::WorkItem(number) => {
                total_task_minutes += minutes;
                // Stringへの書き込みは失敗しない
                let _ = write!(text, "{}: {}", tag, format_duration(minutes));
                if let Some(config) = config {
                    let _ = write!(text, " ({})", config.work_item_url(number));
                }
                let _ = writeln!(text);
            }
            TagKind::Meeting => total_meeting_minutes += minutes,
            TagKind::Other => {}
        }
    }

    let _ = writeln!(text);
    let _ = writeln!(
        text,
        "Total Task Time: {}",
        format_duration(total_task_minutes)
    );
    let _ = writeln!(
        text,
        "Total Meeting Time: {}",
        format_duration(total_meeting_minutes)
    );

    text
}

/// 分を`"<H>h <M>m"`の形式にする。
pub fn format_duration(minutes: i64) -> String {
    format!("{}h {}m", minutes.div_euclid(60), minutes.rem_euclid(60))
}

/// 分を最も近い15分単位に丸め、時間に換算する。
pub fn round_to_quarter_hours(minutes: i64) -> f64 {
    (minutes as f64 / ROUNDING_MINUTES).round() * ROUNDING_MINUTES / 60.0
}

/// work itemのタグが付いた記録を、送信用のタスクの一覧にする。
///
/// 同じタスク名の記録もまとめずに、1行ごとに丸める。
pub fn submissions(tasks: &TaskCollection) -> Vec<TaskSubmission> {
    tasks
        .iter()
        .filter_map(|(tag, records)| match tag.kind() {
            TagKind::WorkItem(number) => Some((number, records)),
            _ => None,
        })
        .flat_map(|(number, records)| {
            records.iter().map(move |record| TaskSubmission {
                parent_work_item_number: number,
                task_name: record.description.clone(),
                task_time_rounded: round_to_quarter_hours(record.duration_minutes),
            })
        })
        .collect()
}
