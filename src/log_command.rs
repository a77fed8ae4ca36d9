use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::info;

use crate::console::ConsolePresenter;
use crate::log_entry::{format_timestamp, stamp_text, SEPARATOR};
use crate::store::{FileStore, EDITOR_TEXT_KEY};

/// `add`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct AddArgs {
    #[clap(
        required = true,
        help = "Text of the new entry, e.g. \"#1234 write spec\""
    )]
    text: Vec<String>,
}

/// 保存されているログのテキストを読み込む。
///
/// ファイル末尾の改行は空の行として扱わない。
pub fn read_log(store: &FileStore) -> Result<String> {
    let text = store
        .get(EDITOR_TEXT_KEY)
        .context("Failed to read the log")?
        .unwrap_or_default();

    Ok(text.trim_end_matches('\n').to_string())
}

/// ログのテキストを保存する。
fn write_log(store: &FileStore, text: &str) -> Result<()> {
    let content = if text.is_empty() {
        String::new()
    } else {
        format!("{}\n", text)
    };
    store
        .set(EDITOR_TEXT_KEY, &content)
        .context("Failed to write the log")
}

/// `add`サブコマンドの処理を行う。
///
/// 既存の行にタイムスタンプを付与してから、現在時刻の新しい行を末尾に追加する。
pub fn add_command(store: &FileStore, args: AddArgs, now: &DateTime<Local>) -> Result<()> {
    let line = format!(
        "{}{}{}",
        format_timestamp(now.time()),
        SEPARATOR,
        args.text.join(" ")
    );
    let text = read_log(store)?;
    let text = if text.is_empty() {
        line
    } else {
        format!("{}\n{}", stamp_text(&text, now), line)
    };
    write_log(store, &text)?;
    info!("Added entry at {}", format_timestamp(now.time()));

    Ok(())
}

/// `stamp`サブコマンドの処理を行う。
///
/// タイムスタンプの無い行に現在時刻を付与して保存する。
pub fn stamp_command(store: &FileStore, now: &DateTime<Local>) -> Result<()> {
    let text = read_log(store)?;
    if text.is_empty() {
        info!("The log is empty, nothing to stamp.");
        return Ok(());
    }

    let stamped = stamp_text(&text, now);
    if stamped != text {
        write_log(store, &stamped)?;
        info!("Stamped the log.");
    }

    Ok(())
}

/// `show`サブコマンドの処理を行う。
pub fn show_command<P: ConsolePresenter>(store: &FileStore, presenter: &mut P) -> Result<()> {
    let text = read_log(store)?;
    presenter.show_log(&text)
}

/// `clear`サブコマンドの処理を行う。
pub fn clear_command(store: &FileStore) -> Result<()> {
    write_log(store, "")?;
    info!("Cleared the log.");

    Ok(())
}
