use thiserror::Error;

/// Errors that end a sync run or a single item of it.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required setting is absent from the environment, `.env` and `config.yaml`.
    #[error("missing configuration value {env_var} (set it in the environment, .env or config.yaml under `jira.{key}`)")]
    ConfigMissing {
        env_var: &'static str,
        key: &'static str,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse TODO file: {0}")]
    Parse(String),
    #[error(transparent)]
    Remote(#[from] TrackerError),
}

/// Failures reported by the issue tracker client.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("authentication rejected by JIRA (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("JIRA returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request to JIRA failed: {0}")]
    Transport(String),
    #[error("unexpected JIRA response: {0}")]
    Decode(String),
    #[error("no transition leads issue {key} from '{from}' to {target}")]
    NoTransition {
        key: String,
        from: String,
        target: String,
    },
}

impl TrackerError {
    pub fn is_auth(&self) -> bool {
        matches!(self, TrackerError::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TrackerError::Decode(err.to_string())
        } else {
            TrackerError::Transport(err.to_string())
        }
    }
}
