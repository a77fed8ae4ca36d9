use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::SyncConfig;

const API_VERSION: &str = "7.0";
const JSON_PATCH: &str = "application/json-patch+json";

const FIELD_TITLE: &str = "System.Title";
const FIELD_ASSIGNED_TO: &str = "System.AssignedTo";
const FIELD_STATE: &str = "System.State";
const FIELD_COMPLETED_WORK: &str = "Microsoft.VSTS.Scheduling.CompletedWork";
const CHILD_RELATION: &str = "System.LinkTypes.Hierarchy-Forward";
const PARENT_RELATION: &str = "System.LinkTypes.Hierarchy-Reverse";

/// work itemの情報。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorkItem {
    pub id: u64,
    pub title: String,
    /// 担当者の`uniqueName`。
    pub assigned_to: Option<String>,
    pub completed_work: Option<f64>,
    /// 子のwork itemのID。
    pub children: Vec<u64>,
}

/// work item trackerを操作するためのtrait。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkItemRepository {
    /// 子のwork itemを含めてwork itemを取得する。
    async fn read_work_item(&self, id: u64) -> Result<WorkItem>;

    /// 完了した作業時間を更新する。
    async fn update_completed_work(&self, id: u64, hours: f64) -> Result<()>;

    /// 親のwork itemに紐づくタスクを作成する。
    async fn create_task(
        &self,
        parent_id: u64,
        title: &str,
        assigned_to: &str,
        completed_work: f64,
    ) -> Result<WorkItem>;

    /// 状態を更新する。
    async fn update_state(&self, id: u64, state: &str) -> Result<()>;
}

/// work item APIのレスポンスをデシリアライズするための構造体。
#[derive(Debug, Deserialize)]
struct DevOpsWorkItem {
    id: u64,
    fields: DevOpsFields,
    #[serde(default)]
    relations: Vec<DevOpsRelation>,
}

#[derive(Debug, Deserialize)]
struct DevOpsFields {
    #[serde(rename = "System.Title", default)]
    title: String,
    #[serde(rename = "System.AssignedTo")]
    assigned_to: Option<DevOpsIdentity>,
    #[serde(rename = "Microsoft.VSTS.Scheduling.CompletedWork")]
    completed_work: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevOpsIdentity {
    unique_name: String,
}

#[derive(Debug, Deserialize)]
struct DevOpsRelation {
    rel: String,
    url: String,
}

impl From<DevOpsWorkItem> for WorkItem {
    fn from(item: DevOpsWorkItem) -> Self {
        let children = item
            .relations
            .iter()
            .filter(|relation| relation.rel == CHILD_RELATION)
            .filter_map(|relation| relation.url.rsplit('/').next()?.parse::<u64>().ok())
            .collect();

        Self {
            id: item.id,
            title: item.fields.title,
            assigned_to: item.fields.assigned_to.map(|identity| identity.unique_name),
            completed_work: item.fields.completed_work,
            children,
        }
    }
}

/// Azure DevOpsのwork item APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let config = SyncConfig::load(&store)?;
/// let client = DevOpsClient::new(&config);
/// let work_item = client.read_work_item(1234).await?;
/// ```
pub struct DevOpsClient {
    client: Client,
    api_url: String,
    token: String,
}

impl DevOpsClient {
    /// 新しい`DevOpsClient`を返す。
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: format!(
                "{}/{}/{}/_apis/wit/workitems",
                config.url.trim_end_matches('/'),
                config.organization,
                config.project
            ),
            token: config.token.clone(),
        }
    }

    /// JSON Patchのリクエストを送信し、更新後のwork itemを返す。
    async fn send_patch(&self, url: String, operations: Value) -> Result<WorkItem> {
        let item = self
            .client
            .patch(&url)
            .basic_auth("", Some(&self.token))
            .header(CONTENT_TYPE, JSON_PATCH)
            .query(&[("api-version", API_VERSION)])
            .body(operations.to_string())
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<DevOpsWorkItem>()
            .await
            .context("Failed to deserialize response")?;

        Ok(item.into())
    }
}

#[async_trait]
impl WorkItemRepository for DevOpsClient {
    async fn read_work_item(&self, id: u64) -> Result<WorkItem> {
        let url = format!("{}/{}", self.api_url, id);
        let item = self
            .client
            .get(&url)
            .basic_auth("", Some(&self.token))
            .query(&[("$expand", "relations"), ("api-version", API_VERSION)])
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<DevOpsWorkItem>()
            .await
            .context("Failed to deserialize response")?;
        info!(
            "Work item #{} has {} relations",
            item.id,
            item.relations.len()
        );

        Ok(item.into())
    }

    async fn update_completed_work(&self, id: u64, hours: f64) -> Result<()> {
        let operations = json!([
            {"op": "add", "path": format!("/fields/{}", FIELD_COMPLETED_WORK), "value": hours},
        ]);
        self.send_patch(format!("{}/{}", self.api_url, id), operations)
            .await
            .with_context(|| format!("Failed to update completed work of #{}", id))?;

        Ok(())
    }

    async fn create_task(
        &self,
        parent_id: u64,
        title: &str,
        assigned_to: &str,
        completed_work: f64,
    ) -> Result<WorkItem> {
        let operations = json!([
            {"op": "add", "path": format!("/fields/{}", FIELD_TITLE), "value": title},
            {"op": "add", "path": format!("/fields/{}", FIELD_ASSIGNED_TO), "value": assigned_to},
            {"op": "add", "path": format!("/fields/{}", FIELD_COMPLETED_WORK), "value": completed_work},
            {
                "op": "add",
                "path": "/relations/-",
                "value": {
                    "rel": PARENT_RELATION,
                    "url": format!("{}/{}", self.api_url, parent_id),
                },
            },
        ]);
        let url = format!("{}/$Task", self.api_url);
        let item = self
            .client
            .post(&url)
            .basic_auth("", Some(&self.token))
            .header(CONTENT_TYPE, JSON_PATCH)
            .query(&[("api-version", API_VERSION)])
            .body(operations.to_string())
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?
            .error_for_status()
            .context("Request returned an error status")?
            .json::<DevOpsWorkItem>()
            .await
            .context("Failed to deserialize response")?;

        Ok(item.into())
    }

    async fn update_state(&self, id: u64, state: &str) -> Result<()> {
        let operations = json!([
            {"op": "add", "path": format!("/fields/{}", FIELD_STATE), "value": state},
        ]);
        self.send_patch(format!("{}/{}", self.api_url, id), operations)
            .await
            .with_context(|| format!("Failed to update state of #{}", id))?;

        Ok(())
    }
}
