use crate::checklist::{ChecklistItem, summary_prefix};
use crate::error::TrackerError;
use crate::jira::issues::{RemoteIssue, RemoteStatus, RemoteSubtask, UserRef};
use async_trait::async_trait;
use std::fmt;
use tracing::{error, info, warn};

/// Issue tracker operations the reconciler needs.
#[async_trait]
pub trait Tracker: Send + Sync {
    async fn fetch_issue(&self, key: &str) -> Result<RemoteIssue, TrackerError>;

    /// Sub-task of `parent` whose summary equals `summary` exactly.
    async fn find_subtask(
        &self,
        parent: &str,
        summary: &str,
    ) -> Result<Option<RemoteSubtask>, TrackerError>;

    /// Sub-task of `parent` whose summary starts with `"{number}: "`.
    async fn find_subtask_by_number(
        &self,
        parent: &str,
        number: &str,
    ) -> Result<Option<RemoteSubtask>, TrackerError>;

    /// Exact summary match first, then the item number.
    async fn lookup_subtask(
        &self,
        parent: &str,
        summary: &str,
        number: &str,
    ) -> Result<Lookup, TrackerError> {
        if let Some(subtask) = self.find_subtask(parent, summary).await? {
            return Ok(Lookup::ExactSummary(subtask));
        }
        Ok(self
            .find_subtask_by_number(parent, number)
            .await?
            .map_or(Lookup::Missing, Lookup::SameNumber))
    }

    async fn create_subtask(
        &self,
        parent: &str,
        summary: &str,
        description: &str,
    ) -> Result<RemoteSubtask, TrackerError>;

    async fn set_status(
        &self,
        subtask: &RemoteSubtask,
        status: RemoteStatus,
    ) -> Result<(), TrackerError>;

    async fn rename_subtask(
        &self,
        subtask: &RemoteSubtask,
        summary: &str,
    ) -> Result<(), TrackerError>;

    async fn set_assignee(
        &self,
        subtask: &RemoteSubtask,
        user: &UserRef,
    ) -> Result<(), TrackerError>;
}

/// How an item was matched against the parent's sub-tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    ExactSummary(RemoteSubtask),
    /// Same item number but a different description.
    SameNumber(RemoteSubtask),
    Missing,
}

impl Lookup {
    /// Matches an item against an already listed set of sub-tasks.
    pub fn among(subtasks: &[RemoteSubtask], summary: &str, number: &str) -> Lookup {
        if let Some(subtask) = subtasks.iter().find(|s| s.summary == summary) {
            return Lookup::ExactSummary(subtask.clone());
        }
        let prefix = summary_prefix(number);
        subtasks
            .iter()
            .find(|s| s.summary.starts_with(&prefix))
            .cloned()
            .map_or(Lookup::Missing, Lookup::SameNumber)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubtaskOperation {
    Create {
        summary: String,
        description: String,
        target: RemoteStatus,
    },
    UpdateStatus {
        subtask: RemoteSubtask,
        to: RemoteStatus,
    },
    Rename {
        subtask: RemoteSubtask,
        to: String,
        /// Status applied after the rename, if the status diverges too.
        status: Option<RemoteStatus>,
    },
    Unchanged {
        subtask: RemoteSubtask,
    },
}

impl SubtaskOperation {
    pub fn is_write(&self) -> bool {
        !matches!(self, SubtaskOperation::Unchanged { .. })
    }

    /// Sub-task the operation acts on, `None` for a create.
    pub fn existing(&self) -> Option<&RemoteSubtask> {
        match self {
            SubtaskOperation::Create { .. } => None,
            SubtaskOperation::UpdateStatus { subtask, .. }
            | SubtaskOperation::Rename { subtask, .. }
            | SubtaskOperation::Unchanged { subtask } => Some(subtask),
        }
    }
}

/// Decides what has to happen remotely for one item.
pub fn plan_operation(item: &ChecklistItem, lookup: Lookup) -> SubtaskOperation {
    let target = RemoteStatus::target_for(item.status);

    match lookup {
        Lookup::Missing => SubtaskOperation::Create {
            summary: item.summary(),
            description: item.detail(),
            target,
        },
        Lookup::ExactSummary(subtask) if subtask.status != target => SubtaskOperation::UpdateStatus {
            subtask,
            to: target,
        },
        Lookup::ExactSummary(subtask) => SubtaskOperation::Unchanged { subtask },
        Lookup::SameNumber(subtask) => SubtaskOperation::Rename {
            status: (subtask.status != target).then_some(target),
            to: item.summary(),
            subtask,
        },
    }
}

/// User a sub-task has to be handed to, when it is not theirs yet.
pub fn reassignment(current: Option<&UserRef>, owner: Option<&UserRef>) -> Option<UserRef> {
    owner.filter(|owner| current != Some(*owner)).cloned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Apply,
    /// Look up sub-tasks and report the plan without writing anything.
    DryRun,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Created {
        key: String,
        status: RemoteStatus,
    },
    StatusUpdated {
        key: String,
        from: RemoteStatus,
        to: RemoteStatus,
    },
    Renamed {
        key: String,
        status: Option<(RemoteStatus, RemoteStatus)>,
    },
    Unchanged {
        key: String,
    },
    Planned(SubtaskOperation),
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub number: String,
    pub summary: String,
    pub outcome: ItemOutcome,
    /// New assignee, handed over (or planned to be) in this run.
    pub assigned: Option<UserRef>,
}

impl ItemReport {
    fn write_outcome(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ItemOutcome::Created { key, status } => {
                write!(f, "created {key} \"{}\" ({status})", self.summary)
            }
            ItemOutcome::StatusUpdated { key, from, to } => {
                write!(f, "updated {key} \"{}\" ({from} -> {to})", self.summary)
            }
            ItemOutcome::Renamed { key, status } => {
                write!(f, "renamed {key} to \"{}\"", self.summary)?;
                if let Some((from, to)) = status {
                    write!(f, " ({from} -> {to})")?;
                }
                Ok(())
            }
            ItemOutcome::Unchanged { key } => write!(f, "unchanged {key} \"{}\"", self.summary),
            ItemOutcome::Planned(operation) => match operation {
                SubtaskOperation::Create { target, .. } => {
                    write!(f, "would create \"{}\" ({target})", self.summary)
                }
                SubtaskOperation::UpdateStatus { subtask, to } => write!(
                    f,
                    "would update {} \"{}\" ({} -> {to})",
                    subtask.key, self.summary, subtask.status
                ),
                SubtaskOperation::Rename { subtask, to, .. } => write!(
                    f,
                    "would rename {} \"{}\" to \"{to}\"",
                    subtask.key, subtask.summary
                ),
                SubtaskOperation::Unchanged { subtask } => {
                    write!(f, "unchanged {} \"{}\"", subtask.key, self.summary)
                }
            },
            ItemOutcome::Failed { error } => {
                write!(f, "failed {} \"{}\": {error}", self.number, self.summary)
            }
        }
    }
}

impl fmt::Display for ItemReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outcome(f)?;
        match (&self.assigned, &self.outcome) {
            (Some(user), ItemOutcome::Planned(_)) => write!(f, ", would assign to {user}"),
            (Some(user), _) => write!(f, ", assigned to {user}"),
            (None, _) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub items: Vec<ItemReport>,
    /// Set when JIRA rejected the credentials and the remaining items were skipped.
    pub aborted: Option<String>,
}

impl SyncReport {
    fn count(&self, predicate: impl Fn(&ItemReport) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(item)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|i| matches!(i.outcome, ItemOutcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|i| matches!(i.outcome, ItemOutcome::StatusUpdated { .. }))
    }

    pub fn renamed(&self) -> usize {
        self.count(|i| matches!(i.outcome, ItemOutcome::Renamed { .. }))
    }

    pub fn reassigned(&self) -> usize {
        self.count(|i| i.assigned.is_some() && !matches!(i.outcome, ItemOutcome::Planned(_)))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|i| {
            i.assigned.is_none()
                && matches!(
                    i.outcome,
                    ItemOutcome::Unchanged { .. }
                        | ItemOutcome::Planned(SubtaskOperation::Unchanged { .. })
                )
        })
    }

    pub fn planned(&self) -> usize {
        self.count(|i| match &i.outcome {
            ItemOutcome::Planned(operation) => operation.is_write() || i.assigned.is_some(),
            _ => false,
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|i| matches!(i.outcome, ItemOutcome::Failed { .. }))
    }

    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "Sync finished: {} created, {} updated, {} renamed, {} reassigned, {} unchanged, {} failed",
            self.created(),
            self.updated(),
            self.renamed(),
            self.reassigned(),
            self.unchanged(),
            self.failed()
        );
        if self.planned() > 0 {
            line.push_str(&format!(", {} planned (dry run)", self.planned()));
        }
        line
    }
}

async fn apply<T: Tracker + ?Sized>(
    tracker: &T,
    parent: &str,
    owner: Option<&UserRef>,
    operation: SubtaskOperation,
) -> Result<(ItemOutcome, Option<UserRef>), TrackerError> {
    let (subtask, outcome) = match operation {
        SubtaskOperation::Create {
            summary,
            description,
            target,
        } => {
            let created = tracker.create_subtask(parent, &summary, &description).await?;
            if created.status != target {
                if let Err(e) = tracker.set_status(&created, target).await {
                    warn!(key = %created.key, %target, "sub-task created but left in its initial status");
                    return Err(e);
                }
            }
            let outcome = ItemOutcome::Created {
                key: created.key.clone(),
                status: target,
            };
            (created, outcome)
        }
        SubtaskOperation::UpdateStatus { subtask, to } => {
            tracker.set_status(&subtask, to).await?;
            let outcome = ItemOutcome::StatusUpdated {
                key: subtask.key.clone(),
                from: subtask.status,
                to,
            };
            (subtask, outcome)
        }
        SubtaskOperation::Rename {
            subtask,
            to,
            status,
        } => {
            tracker.rename_subtask(&subtask, &to).await?;
            if let Some(target) = status {
                tracker.set_status(&subtask, target).await?;
            }
            let outcome = ItemOutcome::Renamed {
                key: subtask.key.clone(),
                status: status.map(|target| (subtask.status, target)),
            };
            (subtask, outcome)
        }
        SubtaskOperation::Unchanged { subtask } => {
            let outcome = ItemOutcome::Unchanged {
                key: subtask.key.clone(),
            };
            (subtask, outcome)
        }
    };

    let assigned = reassignment(subtask.assignee.as_ref(), owner);
    if let Some(user) = &assigned {
        tracker.set_assignee(&subtask, user).await?;
    }
    Ok((outcome, assigned))
}

async fn sync_item<T: Tracker + ?Sized>(
    tracker: &T,
    parent: &RemoteIssue,
    item: &ChecklistItem,
    mode: SyncMode,
) -> Result<(ItemOutcome, Option<UserRef>), TrackerError> {
    let lookup = tracker
        .lookup_subtask(&parent.key, &item.summary(), &item.number)
        .await?;
    let operation = plan_operation(item, lookup);
    let owner = parent.reporter.as_ref();

    match mode {
        SyncMode::DryRun => {
            let current = operation.existing().and_then(|s| s.assignee.as_ref());
            let assigned = reassignment(current, owner);
            Ok((ItemOutcome::Planned(operation), assigned))
        }
        SyncMode::Apply => apply(tracker, &parent.key, owner, operation).await,
    }
}

fn log_outcome(item: &ChecklistItem, summary: &str, outcome: &ItemOutcome, assigned: Option<&UserRef>) {
    match outcome {
        ItemOutcome::Created { key, .. } => info!(item = %item.number, %key, "created sub-task"),
        ItemOutcome::StatusUpdated { key, from, to } => {
            info!(item = %item.number, %key, %from, %to, "updated sub-task status")
        }
        ItemOutcome::Renamed { key, .. } => {
            warn!(item = %item.number, %key, summary, "description changed, renamed sub-task")
        }
        _ => (),
    }
    if let Some(user) = assigned {
        info!(item = %item.number, assignee = %user, "sub-task handed to the parent's reporter");
    }
}

/// Brings the sub-tasks of `parent` in line with `items`, one item at a time.
///
/// A tracker failure only affects the item it happened on; it is logged and
/// recorded as [`ItemOutcome::Failed`] before moving on. Rejected credentials
/// are the exception: the run stops there and [`SyncReport::aborted`] is set.
/// Every sub-task is assigned to the parent's reporter.
pub async fn reconcile<T: Tracker + ?Sized>(
    tracker: &T,
    parent: &RemoteIssue,
    items: &[ChecklistItem],
    mode: SyncMode,
) -> SyncReport {
    let mut report = SyncReport::default();

    for item in items {
        let summary = item.summary();
        match sync_item(tracker, parent, item, mode).await {
            Ok((outcome, assigned)) => {
                log_outcome(item, &summary, &outcome, assigned.as_ref());
                report.items.push(ItemReport {
                    number: item.number.clone(),
                    summary,
                    outcome,
                    assigned,
                });
            }
            Err(e) => {
                error!(item = %item.number, error = %e, "failed to sync item");
                let rejected = e.is_auth();
                report.items.push(ItemReport {
                    number: item.number.clone(),
                    summary,
                    outcome: ItemOutcome::Failed {
                        error: e.to_string(),
                    },
                    assigned: None,
                });
                if rejected {
                    error!("JIRA rejected the credentials, skipping the remaining items");
                    report.aborted = Some(e.to_string());
                    break;
                }
            }
        }
    }

    report
}
