use crate::error::SyncError;
use crate::locate;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Configuration keys enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Server,
    Username,
    Password,
    ProjectKey,
    ParentIssue,
    SubtaskType,
}

impl ConfigKey {
    /// Key under the `jira:` namespace of `config.yaml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Server => "server",
            ConfigKey::Username => "username",
            ConfigKey::Password => "password",
            ConfigKey::ProjectKey => "project_key",
            ConfigKey::ParentIssue => "parent_issue",
            ConfigKey::SubtaskType => "subtask_type",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            ConfigKey::Server => "JIRA_SERVER",
            ConfigKey::Username => "JIRA_USERNAME",
            ConfigKey::Password => "JIRA_PASSWORD",
            ConfigKey::ProjectKey => "JIRA_PROJECT_KEY",
            ConfigKey::ParentIssue => "JIRA_PARENT_ISSUE",
            ConfigKey::SubtaskType => "JIRA_SUBTASK_TYPE",
        }
    }

    /// Get all config keys
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::Server,
            ConfigKey::Username,
            ConfigKey::Password,
            ConfigKey::ProjectKey,
            ConfigKey::ParentIssue,
            ConfigKey::SubtaskType,
        ]
    }

    fn missing(self) -> SyncError {
        SyncError::ConfigMissing {
            env_var: self.env_var(),
            key: self.as_str(),
        }
    }
}

/// Filename of the YAML configuration, searched next to the TODO file and upward.
pub const CONFIG_FILENAME: &str = "config.yaml";
/// Top-level mapping in `config.yaml` that holds the JIRA settings.
pub const CONFIG_NAMESPACE: &str = "jira";
/// Dotenv file loaded into the process environment before reading it.
pub const DOTENV_FILENAME: &str = ".env";
pub const DEFAULT_SUBTASK_TYPE: &str = "Sub-task";

/// Parses `config.yaml` content into a map of configuration values.
///
/// Only the `jira:` mapping is read. Scalars are converted to strings and
/// empty values are dropped.
///
/// - Returns an empty map if `content` is empty, whitespace, or has no `jira:` key.
/// - Returns `SyncError::InvalidConfig` if the YAML is malformed or `jira:` is not a mapping.
pub fn parse_config(content: &[u8]) -> Result<HashMap<ConfigKey, String>, SyncError> {
    if content.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(HashMap::new());
    }

    let value: Value = serde_yaml::from_slice(content)
        .map_err(|e| SyncError::InvalidConfig(format!("failed to parse {CONFIG_FILENAME}: {e}")))?;

    let namespace = match &value {
        Value::Mapping(map) => match map.get(CONFIG_NAMESPACE) {
            Some(Value::Mapping(jira)) => jira,
            Some(Value::Null) | None => return Ok(HashMap::new()),
            Some(_) => {
                return Err(SyncError::InvalidConfig(format!(
                    "`{CONFIG_NAMESPACE}` in {CONFIG_FILENAME} must be a mapping"
                )));
            }
        },
        Value::Null => return Ok(HashMap::new()),
        _ => {
            return Err(SyncError::InvalidConfig(format!(
                "{CONFIG_FILENAME} must be a mapping"
            )));
        }
    };

    let config_map = ConfigKey::all()
        .iter()
        .filter_map(|key| {
            let text = match namespace.get(key.as_str())? {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            (!text.is_empty()).then_some((*key, text))
        })
        .collect();

    Ok(config_map)
}

/// Picks the JIRA settings out of environment variables. Empty values are dropped.
pub fn config_from_env<I>(vars: I) -> HashMap<ConfigKey, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: HashMap<String, String> = vars.into_iter().collect();
    ConfigKey::all()
        .iter()
        .filter_map(|key| {
            vars.get(key.env_var())
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| (*key, v.to_string()))
        })
        .collect()
}

/// Merges `updates` into `base_config` and returns a new configuration map.
///
/// - Keys from `updates` are added to a clone of `base_config`.
/// - If a key exists in both, the value from `updates` overwrites the value in the cloned `base_config`.
pub fn update_config(
    base_config: &HashMap<ConfigKey, String>,
    updates: &HashMap<ConfigKey, String>,
) -> HashMap<ConfigKey, String> {
    let mut new_config = base_config.clone();
    for (key, value) in updates {
        new_config.insert(*key, value.clone());
    }
    new_config
}

/// Resolved connection settings for one sync run.
#[derive(Clone, PartialEq, Eq)]
pub struct JiraConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub project_key: String,
    pub parent_issue: String,
    pub subtask_type: String,
}

impl fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"***")
            .field("project_key", &self.project_key)
            .field("parent_issue", &self.parent_issue)
            .field("subtask_type", &self.subtask_type)
            .finish()
    }
}

impl JiraConfig {
    pub fn from_map(config: &HashMap<ConfigKey, String>) -> Result<Self, SyncError> {
        let require = |key: ConfigKey| config.get(&key).cloned().ok_or_else(|| key.missing());

        let server = require(ConfigKey::Server)?;
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(SyncError::InvalidConfig(format!(
                "{} must start with http:// or https://, got '{server}'",
                ConfigKey::Server.env_var()
            )));
        }
        let username = require(ConfigKey::Username)?;
        let password = require(ConfigKey::Password)?;
        let parent_issue = require(ConfigKey::ParentIssue)?;
        let project_key = match config.get(&ConfigKey::ProjectKey) {
            Some(key) => key.clone(),
            None => project_of(&parent_issue).ok_or_else(|| ConfigKey::ProjectKey.missing())?,
        };
        let subtask_type = config
            .get(&ConfigKey::SubtaskType)
            .cloned()
            .unwrap_or_else(|| DEFAULT_SUBTASK_TYPE.to_string());

        Ok(JiraConfig {
            server: server.trim_end_matches('/').to_string(),
            username,
            password,
            project_key,
            parent_issue,
            subtask_type,
        })
    }
}

/// Project key of an issue key, e.g. `PFM` for `PFM-33`.
pub fn project_of(issue_key: &str) -> Option<String> {
    let (project, number) = issue_key.rsplit_once('-')?;
    let valid = !project.is_empty()
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit());
    valid.then(|| project.to_string())
}

/// Loads settings visible from `start`: the nearest `.env` (never overriding
/// variables already set), the process environment, then the nearest
/// `config.yaml`, whose values win.
pub fn load(start: &Path) -> Result<JiraConfig, SyncError> {
    if let Some(dotenv_path) = locate::find_upwards(start, DOTENV_FILENAME) {
        match dotenv::from_path(&dotenv_path) {
            Ok(()) => debug!(path = %dotenv_path.display(), "loaded dotenv file"),
            Err(e) => warn!(path = %dotenv_path.display(), error = %e, "ignoring unreadable dotenv file"),
        }
    }
    let env_config = config_from_env(std::env::vars());

    let file_config = match locate::find_upwards(start, CONFIG_FILENAME) {
        Some(path) => {
            let content = std::fs::read(&path).map_err(|e| {
                SyncError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
            })?;
            debug!(path = %path.display(), "loaded config file");
            parse_config(&content)?
        }
        None => HashMap::new(),
    };

    JiraConfig::from_map(&update_config(&env_config, &file_config))
}
