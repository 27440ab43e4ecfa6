use crate::checklist::ItemStatus;
use serde::Deserialize;
use serde_json::json;
use std::fmt;

/// Status names that end a sub-task's workflow even though JIRA files them
/// under the `indeterminate` category (`На ревью`, `In Review`).
const FINAL_STATUS_WORDS: &[&str] = &["ревью", "review"];

/// Workflow state of a JIRA issue, taken from its status category so that
/// localized status names need no translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RemoteStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
}

impl RemoteStatus {
    /// Maps a status category key (`new`, `indeterminate`, `done`).
    /// Unknown categories, including JIRA's `undefined`, count as To Do.
    pub fn from_category_key(key: &str) -> RemoteStatus {
        match key {
            "done" => RemoteStatus::Done,
            "indeterminate" => RemoteStatus::InProgress,
            _ => RemoteStatus::ToDo,
        }
    }

    /// State of a workflow status: review statuses are final, everything
    /// else follows its category.
    pub fn from_status(name: &str, category_key: &str) -> RemoteStatus {
        let name = name.to_lowercase();
        if FINAL_STATUS_WORDS.iter().any(|w| name.contains(w)) {
            RemoteStatus::Done
        } else {
            RemoteStatus::from_category_key(category_key)
        }
    }

    /// Target state of a checklist item. Total over [`ItemStatus`].
    pub fn target_for(status: ItemStatus) -> RemoteStatus {
        match status {
            ItemStatus::Done => RemoteStatus::Done,
            ItemStatus::Pending => RemoteStatus::ToDo,
            ItemStatus::InProgress => RemoteStatus::InProgress,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RemoteStatus::ToDo => "To Do",
            RemoteStatus::InProgress => "In Progress",
            RemoteStatus::Done => "Done",
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A JIRA user as the assignee API addresses it: by login name on JIRA
/// Server, by account id on JIRA Cloud.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserRef {
    Name(String),
    AccountId(String),
}

impl UserRef {
    /// Body of `PUT /rest/api/2/issue/{key}/assignee`.
    pub fn assignee_body(&self) -> serde_json::Value {
        match self {
            UserRef::Name(name) => json!({ "name": name }),
            UserRef::AccountId(id) => json!({ "accountId": id }),
        }
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Name(name) => f.write_str(name),
            UserRef::AccountId(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteIssue {
    pub key: String,
    pub summary: String,
    pub status: RemoteStatus,
    /// Status name as configured in the JIRA workflow, e.g. `В работе`.
    pub status_name: String,
    pub assignee: Option<UserRef>,
    pub reporter: Option<UserRef>,
}

/// A sub-task of the parent issue.
pub type RemoteSubtask = RemoteIssue;

#[derive(Deserialize, Debug)]
pub struct StatusCategoryField {
    pub key: String,
}

#[derive(Deserialize, Debug)]
pub struct StatusField {
    pub name: String,
    #[serde(rename = "statusCategory")]
    pub status_category: StatusCategoryField,
}

impl StatusField {
    pub fn remote_status(&self) -> RemoteStatus {
        RemoteStatus::from_status(&self.name, &self.status_category.key)
    }
}

#[derive(Deserialize, Debug)]
pub struct UserField {
    pub name: Option<String>,
    #[serde(rename = "accountId")]
    pub account_id: Option<String>,
}

impl UserField {
    fn user_ref(self) -> Option<UserRef> {
        self.name
            .map(UserRef::Name)
            .or_else(|| self.account_id.map(UserRef::AccountId))
    }
}

#[derive(Deserialize, Debug)]
pub struct IssueFields {
    pub summary: String,
    pub status: StatusField,
    #[serde(default)]
    pub assignee: Option<UserField>,
    #[serde(default)]
    pub reporter: Option<UserField>,
}

/// Issue as returned by `/rest/api/2/issue/{key}` and inside search results.
#[derive(Deserialize, Debug)]
pub struct IssueResponse {
    pub key: String,
    pub fields: IssueFields,
}

impl From<IssueResponse> for RemoteIssue {
    fn from(issue: IssueResponse) -> Self {
        let fields = issue.fields;
        RemoteIssue {
            key: issue.key,
            summary: fields.summary,
            status: fields.status.remote_status(),
            status_name: fields.status.name,
            assignee: fields.assignee.and_then(UserField::user_ref),
            reporter: fields.reporter.and_then(UserField::user_ref),
        }
    }
}
/// One page of `/rest/api/2/search`.
#[derive(Debug, PartialEq)]
pub struct SearchPage {
    pub start_at: u32,
    pub total: u32,
    pub issues: Vec<RemoteIssue>,
}

impl SearchPage {
    /// `startAt` of the following page, or `None` when this page is the last.
    pub fn next_start(&self) -> Option<u32> {
        let next = self.start_at + self.issues.len() as u32;
        (!self.issues.is_empty() && next < self.total).then_some(next)
    }
}

/// Decodes a search response. Entries without a key, summary or status are
/// skipped rather than failing the whole page.
pub fn parse_search_page(json: &serde_json::Value) -> SearchPage {
    let issues = json["issues"]
        .as_array()
        .map(|issues| {
            issues
                .iter()
                .filter_map(|issue| {
                    serde_json::from_value::<IssueResponse>(issue.clone())
                        .ok()
                        .map(RemoteIssue::from)
                })
                .collect()
        })
        .unwrap_or_default();

    SearchPage {
        start_at: json["startAt"].as_u64().unwrap_or(0) as u32,
        total: json["total"].as_u64().unwrap_or(0) as u32,
        issues,
    }
}
