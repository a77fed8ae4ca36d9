use std::io::Write;

use anyhow::{Context, Result};
use clap::Subcommand;
use log::info;

use crate::config::SyncConfig;
use crate::store::FileStore;

/// `config`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// work item trackerへの接続情報を保存する。
    Set(SetArgs),
    /// 保存されている設定をtokenを伏せて表示する。
    Show,
}

#[derive(Debug, clap::Args)]
struct SetArgs {
    #[clap(long, help = "Service URL, e.g. https://dev.azure.com")]
    url: String,

    #[clap(long, help = "Personal access token")]
    token: String,

    #[clap(long)]
    organization: String,

    #[clap(long)]
    project: String,

    #[clap(long, help = "Assignee of the tasks, e.g. me@example.com")]
    username: String,
}

/// `config`サブコマンドの処理を行う。
pub fn config_command<W: Write>(store: &FileStore, args: ConfigArgs, writer: &mut W) -> Result<()> {
    match args.action {
        ConfigAction::Set(set) => {
            let config = SyncConfig {
                url: set.url,
                token: set.token,
                organization: set.organization,
                project: set.project,
                username: set.username,
            };
            config.save(store).context("Failed to save configuration")?;
            info!("Saved configuration to {}", store.dir().display());
        }
        ConfigAction::Show => {
            let config = SyncConfig::load(store)?;
            write!(writer, "{}", config.masked()).context("Failed to write configuration")?;
        }
    }

    Ok(())
}
