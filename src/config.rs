use std::fmt;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::store::{FileStore, CONFIG_KEY};

/// work item trackerへ同期するための設定。
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// サービスのURL。例: `https://dev.azure.com`
    pub url: String,
    /// Personal access token。
    pub token: String,
    pub organization: String,
    pub project: String,
    /// タスクの担当者として使うユーザー名。
    pub username: String,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("url", &self.url)
            .field("token", &mask(&self.token))
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("username", &self.username)
            .finish()
    }
}

impl SyncConfig {
    /// ストアから設定を読み込む。
    ///
    /// 設定が保存されていない場合や、空の項目がある場合はエラーを返す。
    pub fn load(store: &FileStore) -> Result<Self> {
        match Self::try_load(store)? {
            Some(config) => Ok(config),
            None => bail!("Configuration not found. Run `tasklog config set` first"),
        }
    }

    /// ストアから設定を読み込む。設定が保存されていない場合は`None`を返す。
    pub fn try_load(store: &FileStore) -> Result<Option<Self>> {
        let json = match store.get(CONFIG_KEY)? {
            Some(json) => json,
            None => return Ok(None),
        };
        let config: Self = serde_json::from_str(&json).context("Failed to parse configuration")?;
        config.validate()?;

        Ok(Some(config))
    }

    /// work itemのページのURLを返す。
    ///
    /// # Examples
    /// ```
    /// // url: https://dev.azure.com, organization: org, project: proj
    /// assert_eq!(config.work_item_url(1234), "https://dev.azure.com/org/proj/_workitems/edit/1234");
    /// ```
    pub fn work_item_url(&self, number: u64) -> String {
        format!(
            "{}/{}/{}/_workitems/edit/{}",
            self.url.trim_end_matches('/'),
            self.organization,
            self.project,
            number
        )
    }

    /// ストアに設定を保存する。
    pub fn save(&self, store: &FileStore) -> Result<()> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;
        store.set(CONFIG_KEY, &json)
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("url", &self.url),
            ("token", &self.token),
            ("organization", &self.organization),
            ("project", &self.project),
            ("username", &self.username),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            bail!("Configuration `{}` must not be empty", name);
        }

        Ok(())
    }

    /// tokenを伏せた表示用の文字列を返す。
    pub fn masked(&self) -> String {
        format!(
            "url: {}\ntoken: {}\norganization: {}\nproject: {}\nusername: {}\n",
            self.url,
            mask(&self.token),
            self.organization,
            self.project,
            self.username
        )
    }
}

/// 末尾4文字以外を伏せる。
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let visible = chars.len().saturating_sub(4);
    chars
        .iter()
        .enumerate()
        .map(|(index, c)| if index < visible { '*' } else { *c })
        .collect()
}
