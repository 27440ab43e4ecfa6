use crate::jira::issues::{RemoteStatus, StatusField};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct TransitionResponse {
    id: String,
    name: String,
    to: StatusField,
}

#[derive(Deserialize, Debug)]
struct TransitionsResponse {
    transitions: Vec<TransitionResponse>,
}

/// A workflow transition available on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub to_name: String,
    pub to_status: RemoteStatus,
}

pub fn parse_transitions(json: &str) -> Result<Vec<Transition>, serde_json::Error> {
    let response: TransitionsResponse = serde_json::from_str(json)?;
    Ok(response
        .transitions
        .into_iter()
        .map(|t| Transition {
            id: t.id,
            to_status: t.to.remote_status(),
            to_name: t.to.name,
            name: t.name,
        })
        .collect())
}

/// Words that identify a transition (or its target status) leading to `target`
/// in workflows whose statuses carry no usable category.
fn keywords(target: RemoteStatus) -> &'static [&'static str] {
    match target {
        RemoteStatus::ToDo => &["to do", "open", "reopen", "backlog", "к выполнению", "открыт"],
        RemoteStatus::InProgress => &[
            "in progress",
            "start",
            "begin",
            "в работ",
            "в процессе",
            "начать",
        ],
        RemoteStatus::Done => &[
            "done",
            "resolve",
            "close",
            "review",
            "готово",
            "завершен",
            "выполнено",
            "ревью",
        ],
    }
}

/// Picks the transition that moves an issue to `target`: first by target
/// status category, then by keywords in the transition or status name.
pub fn choose_transition(transitions: &[Transition], target: RemoteStatus) -> Option<&Transition> {
    transitions
        .iter()
        .find(|t| t.to_status == target)
        .or_else(|| {
            let words = keywords(target);
            transitions.iter().find(|t| {
                let name = t.name.to_lowercase();
                let to_name = t.to_name.to_lowercase();
                words.iter().any(|w| name.contains(w) || to_name.contains(w))
            })
        })
}

/// Intermediate state to pass through when no transition reaches `target`
/// directly, e.g. To Do → In Progress → Done.
pub fn intermediate_step(target: RemoteStatus) -> Option<RemoteStatus> {
    match target {
        RemoteStatus::Done => Some(RemoteStatus::InProgress),
        RemoteStatus::ToDo | RemoteStatus::InProgress => None,
    }
}
