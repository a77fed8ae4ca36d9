use anyhow::Result;
use chrono::{DateTime, Local};
use log::{info, warn};

use crate::config::SyncConfig;
use crate::console::ConsolePresenter;
use crate::log_command::read_log;
use crate::log_entry::{parse_log, stamp_text};
use crate::store::FileStore;
use crate::summary::summarize;
use crate::task::{collect_tasks, TaskCollection};

/// 保存されているログからタスクの一覧を作る。
///
/// タイムスタンプの無い行は現在時刻として扱うが、ログは保存しない。
pub fn read_tasks(store: &FileStore, now: &DateTime<Local>) -> Result<TaskCollection> {
    let text = stamp_text(&read_log(store)?, now);
    let entries = parse_log(&text, now);
    info!("length of log entries: {}", entries.len());

    Ok(collect_tasks(&entries))
}

/// `summary`サブコマンドの処理を行う。
///
/// 設定が保存されていればwork itemへのリンクも表示する。設定が読めない場合はリンクを省く。
pub fn summary_command<P: ConsolePresenter>(
    store: &FileStore,
    now: &DateTime<Local>,
    presenter: &mut P,
) -> Result<()> {
    let tasks = read_tasks(store, now)?;
    if tasks.is_empty() {
        info!("No tagged entries in the log.");
    }
    let config = SyncConfig::try_load(store).unwrap_or_else(|err| {
        warn!("Skip work item links: {:#}", err);
        None
    });

    presenter.show_summary(&summarize(&tasks), config.as_ref())
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    use super::{read_tasks, summary_command};
    use crate::config::SyncConfig;
    use crate::console::ConsoleText;
    use crate::store::{FileStore, EDITOR_TEXT_KEY};

    #[test]
    fn test_summary_command() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(Some(dir.path().to_path_buf())).unwrap();
        store
            .set(
                EDITOR_TEXT_KEY,
                "9:00 AM - start\n9:30 AM - #meeting standup\n9:45 AM - #meeting sync\n11:55 AM - #1234 design\n",
            )
            .unwrap();
        let now = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut writer = Vec::new();
        let mut presenter = ConsoleText::new(&mut writer, false);

        summary_command(&store, &now, &mut presenter).unwrap();

        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "Tasks:\n#1234: 2h 10m\n\nTotal Task Time: 2h 10m\nTotal Meeting Time: 0h 45m\n"
        );
    }

    /// 設定が保存されている場合はwork itemの行にリンクを付ける。
    #[test]
    fn test_summary_command_with_config() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(Some(dir.path().to_path_buf())).unwrap();
        store
            .set(EDITOR_TEXT_KEY, "9:00 AM - start\n9:20 AM - #42 review\n")
            .unwrap();
        SyncConfig {
            url: "https://dev.azure.com".to_string(),
            token: "secret-token".to_string(),
            organization: "org".to_string(),
            project: "proj".to_string(),
            username: "me@example.com".to_string(),
        }
        .save(&store)
        .unwrap();
        let now = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut writer = Vec::new();
        let mut presenter = ConsoleText::new(&mut writer, false);

        summary_command(&store, &now, &mut presenter).unwrap();

        assert!(String::from_utf8(writer)
            .unwrap()
            .contains("#42: 0h 20m (https://dev.azure.com/org/proj/_workitems/edit/42)\n"));
    }

    /// タイムスタンプの無い最後の行は現在時刻までの経過時間になり、ログは書き換えない。
    #[test]
    fn test_read_tasks_unstamped_line() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(Some(dir.path().to_path_buf())).unwrap();
        store
            .set(EDITOR_TEXT_KEY, "9:00 AM - #1 a\n9:20 AM - #2 b\nworking")
            .unwrap();
        let now = Local.with_ymd_and_hms(2024, 5, 1, 9, 50, 0).unwrap();

        let tasks = read_tasks(&store, &now).unwrap();

        assert_eq!(tasks.get("2").unwrap()[0].duration_minutes, 20);
        assert_eq!(tasks.iter().count(), 2);
        assert_eq!(
            store.get(EDITOR_TEXT_KEY).unwrap().unwrap(),
            "9:00 AM - #1 a\n9:20 AM - #2 b\nworking"
        );
    }
}
