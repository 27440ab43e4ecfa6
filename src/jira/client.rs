use crate::checklist::summary_prefix;
use crate::config::JiraConfig;
use crate::error::TrackerError;
use crate::jira::issues::{
    IssueResponse, RemoteIssue, RemoteStatus, RemoteSubtask, UserRef, parse_search_page,
};
use crate::jira::sync::{Lookup, Tracker};
use crate::jira::transitions::{self, Transition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// JIRA REST API v2 paths
mod endpoints {
    pub const SEARCH: &str = "/rest/api/2/search";
    pub const ISSUE: &str = "/rest/api/2/issue";
    pub const MYSELF: &str = "/rest/api/2/myself";
}

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const PAGE_SIZE: u32 = 100;
const ISSUE_FIELDS: &str = "summary,status,assignee,reporter";
/// Longest error body kept in [`TrackerError::Http`].
const ERROR_BODY_LIMIT: usize = 500;

/// JQL selecting every sub-task of `parent` in `project`.
pub fn subtasks_jql(project: &str, parent: &str) -> String {
    format!(
        "project = \"{}\" AND parent = \"{}\" ORDER BY key ASC",
        escape_jql(project),
        escape_jql(parent)
    )
}

fn escape_jql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Deserialize, Debug)]
struct CreatedIssue {
    key: String,
}

pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    project_key: String,
    subtask_type: String,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("todo-jira-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(JiraClient {
            http,
            base_url: config.server.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            project_key: config.project_key.clone(),
            subtask_type: config.subtask_type.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, TrackerError> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TrackerError::Unauthorized {
                status: status.as_u16(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::Http {
            status: status.as_u16(),
            body: body.chars().take(ERROR_BODY_LIMIT).collect(),
        })
    }

    async fn list_subtasks(&self, parent: &str) -> Result<Vec<RemoteSubtask>, TrackerError> {
        let jql = subtasks_jql(&self.project_key, parent);
        let mut all_subtasks = Vec::new();
        let max_results = PAGE_SIZE.to_string();
        let mut start_at: u32 = 0;

        loop {
            let start = start_at.to_string();
            let response = self
                .send(self.http.get(self.url(endpoints::SEARCH)).query(&[
                    ("jql", jql.as_str()),
                    ("startAt", start.as_str()),
                    ("maxResults", max_results.as_str()),
                    ("fields", ISSUE_FIELDS),
                ]))
                .await?;
            let page = parse_search_page(&response.json::<serde_json::Value>().await?);
            let next = page.next_start();
            all_subtasks.extend(page.issues);

            match next {
                Some(next) => start_at = next,
                None => break,
            }
        }

        debug!(parent, count = all_subtasks.len(), "listed sub-tasks");
        Ok(all_subtasks)
    }

    async fn transitions(&self, key: &str) -> Result<Vec<Transition>, TrackerError> {
        let url = self.url(&format!("{}/{key}/transitions", endpoints::ISSUE));
        let response = self.send(self.http.get(url)).await?;
        let text = response.text().await?;
        transitions::parse_transitions(&text).map_err(|e| TrackerError::Decode(e.to_string()))
    }

    async fn execute_transition(&self, key: &str, transition: &Transition) -> Result<(), TrackerError> {
        let url = self.url(&format!("{}/{key}/transitions", endpoints::ISSUE));
        self.send(
            self.http
                .post(url)
                .json(&json!({ "transition": { "id": transition.id } })),
        )
        .await?;
        debug!(key, transition = %transition.name, to = %transition.to_name, "executed transition");
        Ok(())
    }

    /// Raw `/myself` response for the configured credentials.
    pub async fn myself(&self) -> Result<String, TrackerError> {
        let response = self.send(self.http.get(self.url(endpoints::MYSELF))).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Tracker for JiraClient {
    async fn fetch_issue(&self, key: &str) -> Result<RemoteIssue, TrackerError> {
        let url = self.url(&format!("{}/{key}", endpoints::ISSUE));
        let response = self
            .send(self.http.get(url).query(&[("fields", ISSUE_FIELDS)]))
            .await?;
        Ok(response.json::<IssueResponse>().await?.into())
    }

    async fn find_subtask(
        &self,
        parent: &str,
        summary: &str,
    ) -> Result<Option<RemoteSubtask>, TrackerError> {
        Ok(self
            .list_subtasks(parent)
            .await?
            .into_iter()
            .find(|subtask| subtask.summary == summary))
    }

    async fn find_subtask_by_number(
        &self,
        parent: &str,
        number: &str,
    ) -> Result<Option<RemoteSubtask>, TrackerError> {
        let prefix = summary_prefix(number);
        Ok(self
            .list_subtasks(parent)
            .await?
            .into_iter()
            .find(|subtask| subtask.summary.starts_with(&prefix)))
    }

    async fn lookup_subtask(
        &self,
        parent: &str,
        summary: &str,
        number: &str,
    ) -> Result<Lookup, TrackerError> {
        let subtasks = self.list_subtasks(parent).await?;
        Ok(Lookup::among(&subtasks, summary, number))
    }

    async fn create_subtask(
        &self,
        parent: &str,
        summary: &str,
        description: &str,
    ) -> Result<RemoteSubtask, TrackerError> {
        let body = json!({
            "fields": {
                "project": { "key": self.project_key },
                "parent": { "key": parent },
                "summary": summary,
                "description": description,
                "issuetype": { "name": self.subtask_type },
            }
        });
        let response = self
            .send(self.http.post(self.url(endpoints::ISSUE)).json(&body))
            .await?;
        let created = response.json::<CreatedIssue>().await?;

        // The create response carries no status; read back the initial one.
        self.fetch_issue(&created.key).await
    }

    async fn set_status(
        &self,
        subtask: &RemoteSubtask,
        status: RemoteStatus,
    ) -> Result<(), TrackerError> {
        let available = self.transitions(&subtask.key).await?;
        if let Some(transition) = transitions::choose_transition(&available, status) {
            return self.execute_transition(&subtask.key, transition).await;
        }

        let first = transitions::intermediate_step(status)
            .and_then(|step| transitions::choose_transition(&available, step));
        if let Some(first) = first {
            self.execute_transition(&subtask.key, first).await?;
            let available = self.transitions(&subtask.key).await?;
            if let Some(second) = transitions::choose_transition(&available, status) {
                return self.execute_transition(&subtask.key, second).await;
            }
            warn!(key = %subtask.key, stopped_at = %first.to_name, %status, "no transition onward from the intermediate status");
            return Err(TrackerError::NoTransition {
                key: subtask.key.clone(),
                from: first.to_name.clone(),
                target: status.to_string(),
            });
        }

        Err(TrackerError::NoTransition {
            key: subtask.key.clone(),
            from: subtask.status_name.clone(),
            target: status.to_string(),
        })
    }

    async fn rename_subtask(
        &self,
        subtask: &RemoteSubtask,
        summary: &str,
    ) -> Result<(), TrackerError> {
        let url = self.url(&format!("{}/{}", endpoints::ISSUE, subtask.key));
        self.send(
            self.http
                .put(url)
                .json(&json!({ "fields": { "summary": summary } })),
        )
        .await?;
        Ok(())
    }

    async fn set_assignee(
        &self,
        subtask: &RemoteSubtask,
        user: &UserRef,
    ) -> Result<(), TrackerError> {
        let url = self.url(&format!("{}/{}/assignee", endpoints::ISSUE, subtask.key));
        self.send(self.http.put(url).json(&user.assignee_body())).await?;
        debug!(key = %subtask.key, assignee = %user, "assigned sub-task");
        Ok(())
    }
}
