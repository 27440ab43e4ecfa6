use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use todo_jira_sync::checklist::summary_prefix;
use todo_jira_sync::error::TrackerError;
use todo_jira_sync::jira::issues::{RemoteIssue, RemoteStatus, RemoteSubtask, UserRef};
use todo_jira_sync::jira::sync::Tracker;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteCall {
    Create(String),
    SetStatus(String, RemoteStatus),
    Rename(String, String),
    Assign(String, UserRef),
}

/// In-memory parent issue with its sub-tasks, recording every write.
#[derive(Debug, Default)]
pub struct FakeTracker {
    subtasks: Mutex<Vec<RemoteSubtask>>,
    writes: Mutex<Vec<WriteCall>>,
    failing_lookups: Mutex<HashSet<String>>,
    reporter: Mutex<Option<UserRef>>,
}

impl FakeTracker {
    pub fn fail_lookup(&self, summary: &str) {
        self.failing_lookups
            .lock()
            .unwrap()
            .insert(summary.to_string());
    }

    pub fn set_reporter(&self, name: &str) {
        *self.reporter.lock().unwrap() = Some(UserRef::Name(name.to_string()));
    }

    /// Changes an assignee behind the sync's back, as a person in JIRA would.
    pub fn reassign_by_hand(&self, summary: &str, name: &str) {
        if let Some(subtask) = self
            .subtasks
            .lock()
            .unwrap()
            .iter_mut()
            .find(|s| s.summary == summary)
        {
            subtask.assignee = Some(UserRef::Name(name.to_string()));
        }
    }

    pub fn writes(&self) -> Vec<WriteCall> {
        self.writes.lock().unwrap().clone()
    }

    pub fn subtask(&self, summary: &str) -> Option<RemoteSubtask> {
        self.subtasks
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.summary == summary)
            .cloned()
    }

    pub fn subtask_count(&self) -> usize {
        self.subtasks.lock().unwrap().len()
    }

    fn update(&self, key: &str, change: impl FnOnce(&mut RemoteSubtask)) {
        if let Some(subtask) = self
            .subtasks
            .lock()
            .unwrap()
            .iter_mut()
            .find(|s| s.key == key)
        {
            change(subtask);
        }
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn fetch_issue(&self, key: &str) -> Result<RemoteIssue, TrackerError> {
        Ok(RemoteIssue {
            key: key.to_string(),
            summary: "Parent".to_string(),
            status: RemoteStatus::InProgress,
            status_name: "In Progress".to_string(),
            assignee: None,
            reporter: self.reporter.lock().unwrap().clone(),
        })
    }

    async fn find_subtask(
        &self,
        _parent: &str,
        summary: &str,
    ) -> Result<Option<RemoteSubtask>, TrackerError> {
        if self.failing_lookups.lock().unwrap().contains(summary) {
            return Err(TrackerError::Transport("simulated network error".to_string()));
        }
        Ok(self.subtask(summary))
    }

    async fn find_subtask_by_number(
        &self,
        _parent: &str,
        number: &str,
    ) -> Result<Option<RemoteSubtask>, TrackerError> {
        let prefix = summary_prefix(number);
        Ok(self
            .subtasks
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.summary.starts_with(&prefix))
            .cloned())
    }

    async fn create_subtask(
        &self,
        parent: &str,
        summary: &str,
        _description: &str,
    ) -> Result<RemoteSubtask, TrackerError> {
        let mut subtasks = self.subtasks.lock().unwrap();
        let project = parent.split('-').next().unwrap_or("TEST");
        let created = RemoteSubtask {
            key: format!("{project}-{}", 100 + subtasks.len()),
            summary: summary.to_string(),
            status: RemoteStatus::ToDo,
            status_name: "To Do".to_string(),
            ..Default::default()
        };
        subtasks.push(created.clone());
        self.writes
            .lock()
            .unwrap()
            .push(WriteCall::Create(summary.to_string()));
        Ok(created)
    }

    async fn set_status(
        &self,
        subtask: &RemoteSubtask,
        status: RemoteStatus,
    ) -> Result<(), TrackerError> {
        self.update(&subtask.key, |s| {
            s.status = status;
            s.status_name = status.name().to_string();
        });
        self.writes
            .lock()
            .unwrap()
            .push(WriteCall::SetStatus(subtask.key.clone(), status));
        Ok(())
    }

    async fn rename_subtask(
        &self,
        subtask: &RemoteSubtask,
        summary: &str,
    ) -> Result<(), TrackerError> {
        self.update(&subtask.key, |s| s.summary = summary.to_string());
        self.writes
            .lock()
            .unwrap()
            .push(WriteCall::Rename(subtask.key.clone(), summary.to_string()));
        Ok(())
    }

    async fn set_assignee(
        &self,
        subtask: &RemoteSubtask,
        user: &UserRef,
    ) -> Result<(), TrackerError> {
        self.update(&subtask.key, |s| s.assignee = Some(user.clone()));
        self.writes
            .lock()
            .unwrap()
            .push(WriteCall::Assign(subtask.key.clone(), user.clone()));
        Ok(())
    }
}
