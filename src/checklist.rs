use std::fmt;

/// Longest description prefix, in characters, kept in a sub-task summary.
pub const SUMMARY_DESCRIPTION_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Done,
    Pending,
    InProgress,
}

impl ItemStatus {
    #[cfg(test)]
    pub fn all() -> &'static [ItemStatus] {
        &[ItemStatus::Done, ItemStatus::Pending, ItemStatus::InProgress]
    }

    /// Parses a status marker without its brackets, e.g. `IN_PROGRESS`.
    pub fn from_marker(marker: &str) -> Option<ItemStatus> {
        match marker.to_ascii_uppercase().as_str() {
            "DONE" => Some(ItemStatus::Done),
            "PENDING" => Some(ItemStatus::Pending),
            "IN_PROGRESS" => Some(ItemStatus::InProgress),
            _ => None,
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            ItemStatus::Done => "DONE",
            ItemStatus::Pending => "PENDING",
            ItemStatus::InProgress => "IN_PROGRESS",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.marker())
    }
}

/// Numbered heading that groups checklist items, e.g. `1. Architecture`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub number: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistItem {
    pub number: String,
    pub description: String,
    pub status: ItemStatus,
    pub section: Option<Section>,
}

impl ChecklistItem {
    /// Summary used as the sub-task title and as its lookup key.
    pub fn summary(&self) -> String {
        let mut chars = self.description.chars();
        let head: String = chars.by_ref().take(SUMMARY_DESCRIPTION_LIMIT).collect();
        if chars.next().is_some() {
            format!("{}: {head}...", self.number)
        } else {
            format!("{}: {head}", self.number)
        }
    }

    /// Detail text placed in the description field of a new sub-task.
    pub fn detail(&self) -> String {
        let mut detail = format!("TODO item {}.\nStatus: {}\n", self.number, self.status);
        if let Some(section) = &self.section {
            detail.push_str(&format!("Section: {}. {}\n", section.number, section.title));
        }
        detail.push('\n');
        detail.push_str(&self.description);
        detail
    }
}

/// Prefix shared by every summary built for an item number.
pub fn summary_prefix(number: &str) -> String {
    format!("{number}: ")
}
