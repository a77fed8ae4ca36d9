use std::collections::HashMap;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::devops::{WorkItem, WorkItemRepository};
use crate::summary::TaskSubmission;

/// 作成したタスクに設定する状態。
const DONE_STATE: &str = "Done";

/// 同期の結果。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 既存のタスクに作業時間を加算した数。
    pub updated: usize,
    /// 新しく作成したタスクの数。
    pub created: usize,
    /// 時刻が戻ったことで負の時間になり、送信しなかった数。
    pub skipped: usize,
}

/// 1件の送信結果。
enum Outcome {
    Updated,
    Created,
}

/// 送信用のタスクをwork item trackerに反映する。
pub struct TaskSynchronizer<'a, T: WorkItemRepository> {
    repository: &'a T,
    username: String,
}

impl<'a, T: WorkItemRepository> TaskSynchronizer<'a, T> {
    /// 新しい`TaskSynchronizer`を返す。
    ///
    /// # Arguments
    ///
    /// * `repository` - work item trackerと通信するためのリポジトリ
    /// * `username` - タスクの担当者
    pub fn new(repository: &'a T, username: &str) -> Self {
        Self {
            repository,
            username: username.to_string(),
        }
    }

    /// タスクを1件ずつ順番に送信する。
    ///
    /// 親のwork itemの子に、同じタイトルで担当者が自分のタスクがあれば作業時間を加算し、
    /// 無ければ新しいタスクを作成して完了にする。
    /// 途中で失敗した場合は残りを送信せずにエラーを返す。送信済みのタスクは元に戻さない。
    pub async fn submit(&self, submissions: &[TaskSubmission]) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut children: HashMap<u64, Vec<u64>> = HashMap::new();

        for submission in submissions {
            if submission.task_time_rounded < 0.0 {
                warn!(
                    "Skip #{} {:?}: negative time {} hours",
                    submission.parent_work_item_number,
                    submission.task_name,
                    submission.task_time_rounded
                );
                report.skipped += 1;
                continue;
            }

            let outcome = self
                .submit_task(submission, &mut children)
                .await
                .with_context(|| {
                    format!(
                        "Failed to submit #{} {:?}. {} of {} tasks were already submitted and are not rolled back",
                        submission.parent_work_item_number,
                        submission.task_name,
                        report.updated + report.created,
                        submissions.len(),
                    )
                })?;
            match outcome {
                Outcome::Updated => report.updated += 1,
                Outcome::Created => report.created += 1,
            }
        }

        Ok(report)
    }

    async fn submit_task(
        &self,
        submission: &TaskSubmission,
        children: &mut HashMap<u64, Vec<u64>>,
    ) -> Result<Outcome> {
        let parent_id = submission.parent_work_item_number;
        if !children.contains_key(&parent_id) {
            let parent = self
                .repository
                .read_work_item(parent_id)
                .await
                .with_context(|| format!("Failed to read work item #{}", parent_id))?;
            children.insert(parent_id, parent.children);
        }
        let siblings = children.entry(parent_id).or_default();

        if let Some(task) = self.find_task(siblings, &submission.task_name).await? {
            let hours = task.completed_work.unwrap_or(0.0) + submission.task_time_rounded;
            self.repository
                .update_completed_work(task.id, hours)
                .await?;
            info!(
                "Updated #{} {:?} to {} hours",
                task.id, submission.task_name, hours
            );
            return Ok(Outcome::Updated);
        }

        let task = self
            .repository
            .create_task(
                parent_id,
                &submission.task_name,
                &self.username,
                submission.task_time_rounded,
            )
            .await?;
        self.repository.update_state(task.id, DONE_STATE).await?;
        siblings.push(task.id);
        info!(
            "Created #{} {:?} under #{} with {} hours",
            task.id, submission.task_name, parent_id, submission.task_time_rounded
        );

        Ok(Outcome::Created)
    }

    /// 子のwork itemから、タイトルと担当者が一致するタスクを探す。
    async fn find_task(&self, children: &[u64], title: &str) -> Result<Option<WorkItem>> {
        for id in children {
            let child = self
                .repository
                .read_work_item(*id)
                .await
                .with_context(|| format!("Failed to read work item #{}", id))?;
            if child.title == title && child.assigned_to.as_deref() == Some(self.username.as_str())
            {
                return Ok(Some(child));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use mockall::predicate::eq;
    use mockall::Sequence;

    use super::{SyncReport, TaskSynchronizer};
    use crate::devops::{MockWorkItemRepository, WorkItem};
    use crate::summary::TaskSubmission;

    const ME: &str = "me@example.com";

    fn submission(parent: u64, name: &str, hours: f64) -> TaskSubmission {
        TaskSubmission {
            parent_work_item_number: parent,
            task_name: name.to_string(),
            task_time_rounded: hours,
        }
    }

    fn parent(id: u64, children: Vec<u64>) -> WorkItem {
        WorkItem {
            id,
            title: "Parent".to_string(),
            children,
            ..Default::default()
        }
    }

    fn task(id: u64, title: &str, assigned_to: &str, completed_work: f64) -> WorkItem {
        WorkItem {
            id,
            title: title.to_string(),
            assigned_to: Some(assigned_to.to_string()),
            completed_work: Some(completed_work),
            children: vec![],
        }
    }

    #[tokio::test]
    async fn test_submit_updates_matching_task() {
        let mut repository = MockWorkItemRepository::new();
        repository
            .expect_read_work_item()
            .with(eq(1234))
            .times(1)
            .returning(|_| Ok(parent(1234, vec![11, 12])));
        repository
            .expect_read_work_item()
            .with(eq(11))
            .times(1)
            .returning(|_| Ok(task(11, "review", ME, 3.0)));
        repository
            .expect_read_work_item()
            .with(eq(12))
            .times(1)
            .returning(|_| Ok(task(12, "write spec", ME, 1.0)));
        repository
            .expect_update_completed_work()
            .with(eq(12), eq(1.5))
            .times(1)
            .returning(|_, _| Ok(()));
        repository.expect_create_task().times(0);

        let synchronizer = TaskSynchronizer::new(&repository, ME);
        let report = synchronizer
            .submit(&[submission(1234, "write spec", 0.5)])
            .await
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                updated: 1,
                created: 0,
                skipped: 0,
            }
        );
    }

    /// タイトルの大文字小文字や担当者が違う場合は新しく作成して完了にする。
    #[tokio::test]
    async fn test_submit_creates_task_when_not_matched() {
        let mut repository = MockWorkItemRepository::new();
        let mut sequence = Sequence::new();
        repository
            .expect_read_work_item()
            .with(eq(1234))
            .returning(|_| Ok(parent(1234, vec![11, 12])));
        repository
            .expect_read_work_item()
            .with(eq(11))
            .returning(|_| Ok(task(11, "Write Spec", ME, 3.0)));
        repository
            .expect_read_work_item()
            .with(eq(12))
            .returning(|_| Ok(task(12, "write spec", "someone@example.com", 1.0)));
        repository
            .expect_create_task()
            .with(eq(1234), eq("write spec"), eq(ME), eq(0.75))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _, _| Ok(task(99, "write spec", ME, 0.75)));
        repository
            .expect_update_state()
            .with(eq(99), eq("Done"))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));
        repository.expect_update_completed_work().times(0);

        let synchronizer = TaskSynchronizer::new(&repository, ME);
        let report = synchronizer
            .submit(&[submission(1234, "write spec", 0.75)])
            .await
            .unwrap();

        assert_eq!(report.created, 1);
    }

    /// 同じ親のタスクが続く場合、親は1回だけ取得し、作成したタスクに加算する。
    #[tokio::test]
    async fn test_submit_same_parent_twice() {
        let mut repository = MockWorkItemRepository::new();
        repository
            .expect_read_work_item()
            .with(eq(1234))
            .times(1)
            .returning(|_| Ok(parent(1234, vec![])));
        repository
            .expect_create_task()
            .times(1)
            .returning(|_, _, _, _| Ok(task(99, "write spec", ME, 0.5)));
        repository
            .expect_update_state()
            .times(1)
            .returning(|_, _| Ok(()));
        repository
            .expect_read_work_item()
            .with(eq(99))
            .times(1)
            .returning(|_| Ok(task(99, "write spec", ME, 0.5)));
        repository
            .expect_update_completed_work()
            .with(eq(99), eq(1.25))
            .times(1)
            .returning(|_, _| Ok(()));

        let synchronizer = TaskSynchronizer::new(&repository, ME);
        let report = synchronizer
            .submit(&[
                submission(1234, "write spec", 0.5),
                submission(1234, "write spec", 0.75),
            ])
            .await
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                updated: 1,
                created: 1,
                skipped: 0,
            }
        );
    }

    /// 0時間のタスクも送信し、負の時間のタスクだけを送信しない。
    #[tokio::test]
    async fn test_submit_skips_negative_hours() {
        let mut repository = MockWorkItemRepository::new();
        repository
            .expect_read_work_item()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(parent(1, vec![])));
        repository
            .expect_create_task()
            .with(eq(1), eq("z"), eq(ME), eq(0.0))
            .times(1)
            .returning(|_, _, _, _| Ok(task(10, "z", ME, 0.0)));
        repository
            .expect_update_state()
            .with(eq(10), eq("Done"))
            .times(1)
            .returning(|_, _| Ok(()));
        repository.expect_update_completed_work().times(0);

        let synchronizer = TaskSynchronizer::new(&repository, ME);
        let report = synchronizer
            .submit(&[submission(1, "a", -0.25), submission(1, "z", 0.0)])
            .await
            .unwrap();

        assert_eq!(
            report,
            SyncReport {
                updated: 0,
                created: 1,
                skipped: 1,
            }
        );
    }

    /// 失敗した時点で残りのタスクは送信しない。
    #[tokio::test]
    async fn test_submit_aborts_on_error() {
        let mut repository = MockWorkItemRepository::new();
        repository
            .expect_read_work_item()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(parent(1, vec![])));
        repository
            .expect_create_task()
            .with(eq(1), eq("a"), eq(ME), eq(0.25))
            .times(1)
            .returning(|_, _, _, _| Ok(task(10, "a", ME, 0.25)));
        repository
            .expect_update_state()
            .times(1)
            .returning(|_, _| Ok(()));
        repository
            .expect_read_work_item()
            .with(eq(2))
            .times(1)
            .returning(|_| Err(anyhow!("401 Unauthorized")));
        repository.expect_read_work_item().with(eq(3)).times(0);

        let synchronizer = TaskSynchronizer::new(&repository, ME);
        let err = synchronizer
            .submit(&[
                submission(1, "a", 0.25),
                submission(2, "b", 0.5),
                submission(3, "c", 0.5),
            ])
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("1 of 3 tasks were already submitted"));
    }
}
