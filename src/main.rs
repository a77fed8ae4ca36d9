use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

mod config;
mod config_command;
mod console;
mod devops;
mod log_command;
mod log_entry;
mod store;
mod submit_command;
mod summary;
mod summary_command;
mod sync;
mod task;

use config_command::{config_command, ConfigArgs};
use console::ConsoleText;
use log_command::{add_command, clear_command, show_command, stamp_command, AddArgs};
use store::FileStore;
use submit_command::{submit_command, SubmitArgs};
use summary_command::summary_command;

/// タイムスタンプ付きのログからタスクごとの作業時間を集計するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- add "#1234 write spec"
/// $ cargo run -- summary
/// $ cargo run -- submit --dry-run
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        long = "data-dir",
        global = true,
        help = "Directory that stores the log and the configuration"
    )]
    data_dir: Option<PathBuf>,

    #[clap(short, long, global = true, help = "Show debug logs")]
    verbose: bool,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// 現在時刻の行をログに追加する。
    Add(AddArgs),
    /// タイムスタンプの無い行に現在時刻を付与する。
    Stamp,
    /// タグを色付けしてログを表示する。
    Show,
    /// ログを空にする。
    Clear,
    /// タスクごとの作業時間を表示する。
    Summary,
    /// 15分単位に丸めた作業時間をwork item trackerに送信する。
    Submit(SubmitArgs),
    /// work item trackerへの接続情報を設定する。
    Config(ConfigArgs),
}

/// ログの出力先を設定する。
fn setup_logger(verbose: bool) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::Cyan);
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for("tasklog", level)
        .chain(io::stderr())
        .apply()
        .context("Failed to set up logger")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger(args.verbose)?;

    let store = FileStore::new(args.data_dir).context("Failed to open the store")?;
    let now = Local::now();
    let mut stdout = io::stdout();
    let colorize = stdout.is_terminal();
    let mut presenter = ConsoleText::new(&mut stdout, colorize);

    match args.subcommand {
        SubCommands::Add(add) => add_command(&store, add, &now)?,
        SubCommands::Stamp => stamp_command(&store, &now)?,
        SubCommands::Show => show_command(&store, &mut presenter)?,
        SubCommands::Clear => clear_command(&store)?,
        SubCommands::Summary => summary_command(&store, &now, &mut presenter)?,
        SubCommands::Submit(submit) => submit_command(&store, submit, &now, &mut presenter).await?,
        SubCommands::Config(config) => config_command(&store, config, &mut io::stdout())?,
    }

    Ok(())
}
