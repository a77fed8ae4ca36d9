use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;

use crate::config::SyncConfig;
use crate::console::ConsolePresenter;
use crate::devops::{DevOpsClient, WorkItemRepository};
use crate::store::FileStore;
use crate::summary::{submissions, TaskSubmission};
use crate::summary_command::read_tasks;
use crate::sync::TaskSynchronizer;

/// `submit`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct SubmitArgs {
    #[clap(long = "dry-run", help = "Show the tasks without sending them")]
    dry_run: bool,

    #[clap(long = "json", help = "Show the tasks as JSON")]
    json: bool,
}

pub struct SubmitCommand<'a, T: WorkItemRepository> {
    synchronizer: TaskSynchronizer<'a, T>,
}

impl<'a, T: WorkItemRepository> SubmitCommand<'a, T> {
    /// 新しい`SubmitCommand`を返す。
    ///
    /// # Arguments
    /// * `repository` - work item trackerと通信するためのリポジトリ
    /// * `username` - タスクの担当者
    pub fn new(repository: &'a T, username: &str) -> Self {
        Self {
            synchronizer: TaskSynchronizer::new(repository, username),
        }
    }

    /// タスクを送信し、結果を表示する。
    pub async fn run<P: ConsolePresenter>(
        &self,
        submissions: &[TaskSubmission],
        presenter: &mut P,
    ) -> Result<()> {
        let report = self
            .synchronizer
            .submit(submissions)
            .await
            .context("Failed to submit tasks")?;
        info!("Tasks submitted successfully.");

        presenter.show_sync_report(&report)
    }
}

/// `submit`サブコマンドの処理を行う。
///
/// 送信するタスクを表示してから、設定を読み込んでwork item trackerに送信する。
/// 設定が無い場合は通信を行わずにエラーを返す。
pub async fn submit_command<P: ConsolePresenter>(
    store: &FileStore,
    args: SubmitArgs,
    now: &DateTime<Local>,
    presenter: &mut P,
) -> Result<()> {
    let submissions = submissions(&read_tasks(store, now)?);
    presenter.show_submissions(&submissions, args.json)?;
    if args.dry_run {
        return Ok(());
    }

    let config = SyncConfig::load(store)?;
    let client = DevOpsClient::new(&config);
    SubmitCommand::new(&client, &config.username)
        .run(&submissions, presenter)
        .await
}
