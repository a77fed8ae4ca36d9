use std::io::Write;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::SyncConfig;
use crate::summary::{summary_text, SummaryCollection, TaskSubmission};
use crate::sync::SyncReport;
use crate::task::{Tag, TagKind};

/// Consoleに集計結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// ログのテキストをタグを強調して表示する。
    fn show_log(&mut self, text: &str) -> Result<()>;

    /// タグごとの集計結果を表示する。
    ///
    /// # Arguments
    ///
    /// * `summary` - 表示する集計結果
    /// * `config` - work itemへのリンクを作るための設定
    fn show_summary(
        &mut self,
        summary: &SummaryCollection,
        config: Option<&SyncConfig>,
    ) -> Result<()>;

    /// 送信用のタスクの一覧を表示する。
    ///
    /// # Arguments
    ///
    /// * `submissions` - 表示するタスク
    /// * `json` - JSON形式で表示するかどうか
    fn show_submissions(&mut self, submissions: &[TaskSubmission], json: bool) -> Result<()>;

    /// 同期の結果を表示する。
    fn show_sync_report(&mut self, report: &SyncReport) -> Result<()>;
}

/// 集計結果をテキストで表示する。
pub struct ConsoleText<'a, W: Write> {
    writer: &'a mut W,
    colorize: bool,
}

impl<'a, W: Write> ConsoleText<'a, W> {
    /// 新しい`ConsoleText`を返す。
    ///
    /// `colorize`が`false`の場合はタグを色付けしない。
    pub fn new(writer: &'a mut W, colorize: bool) -> Self {
        Self { writer, colorize }
    }

    /// 1行の中の`#`で始まる単語を、タグの種類ごとの色にする。
    fn highlight_line(&self, line: &str) -> String {
        line.split(' ')
            .map(|word| match Tag::parse(word) {
                Some(tag) if self.colorize => match tag.kind() {
                    TagKind::WorkItem(_) => word.blue().to_string(),
                    TagKind::Meeting => word.truecolor(255, 165, 0).to_string(),
                    TagKind::Other => word.red().to_string(),
                },
                _ => word.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleText<'a, W> {
    fn show_log(&mut self, text: &str) -> Result<()> {
        for line in text.split('\n') {
            let highlighted = self.highlight_line(line);
            writeln!(self.writer, "{}", highlighted)
                .with_context(|| format!("Failed to write log line: {:?}", line))?;
        }

        Ok(())
    }

    fn show_summary(
        &mut self,
        summary: &SummaryCollection,
        config: Option<&SyncConfig>,
    ) -> Result<()> {
        write!(self.writer, "{}", summary_text(summary, config))
            .context("Failed to write summary")
    }

    fn show_submissions(&mut self, submissions: &[TaskSubmission], json: bool) -> Result<()> {
        if json {
            serde_json::to_writer_pretty(&mut *self.writer, submissions)
                .context("Failed to write submissions as JSON")?;
            writeln!(self.writer).context("Failed to write submissions as JSON")?;
            return Ok(());
        }

        for submission in submissions {
            writeln!(
                self.writer,
                "- #{} {}: {:.2}h",
                submission.parent_work_item_number,
                submission.task_name,
                submission.task_time_rounded
            )
            .with_context(|| format!("Failed to write submission: {:?}", submission))?;
        }

        Ok(())
    }

    fn show_sync_report(&mut self, report: &SyncReport) -> Result<()> {
        writeln!(
            self.writer,
            "Updated: {}, Created: {}, Skipped: {}",
            report.updated, report.created, report.skipped
        )
        .context("Failed to write sync report")
    }
}
