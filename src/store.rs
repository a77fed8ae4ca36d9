use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

/// ログのテキストを保存するキー。
pub const EDITOR_TEXT_KEY: &str = "editorText.txt";

/// 設定のJSONを保存するキー。
pub const CONFIG_KEY: &str = "config.json";

/// キーごとに1ファイルで値を保存する、ディレクトリを使ったキーバリューストア。
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// 新しい`FileStore`を返す。
    ///
    /// ディレクトリが指定されていない場合は、データディレクトリ配下の`tasklog`を利用する。
    pub fn new(dir: Option<PathBuf>) -> Result<Self> {
        let dir = match dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .context("Failed to find the data directory")?
                .join("tasklog"),
        };
        debug!("Store directory: {}", dir.display());

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 値を読み込む。保存されていない場合は`None`を返す。
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.dir.join(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        }
    }

    /// 値を保存する。ディレクトリが無い場合は作成する。
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(key);
        fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Saved {} bytes to {}", value.len(), path.display());

        Ok(())
    }
}
