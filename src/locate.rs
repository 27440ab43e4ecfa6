use std::path::{Path, PathBuf};

/// TODO file names tried in each directory, in order.
pub const TODO_FILENAMES: &[&str] = &["TODO_cursor_plan.md", "TODO.md"];
/// Project subdirectories that may hold the TODO file when run from the repository root.
pub const TODO_SUBDIRECTORIES: &[&str] = &["official-agent"];

/// Returns the first `name` found in `start` or one of its ancestors.
pub fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Finds the TODO file when the tool runs from the repository root or any
/// subdirectory of it.
pub fn find_todo_file(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let nested = TODO_SUBDIRECTORIES.iter().map(|sub| dir.join(sub));
        std::iter::once(dir.to_path_buf())
            .chain(nested)
            .flat_map(|base| TODO_FILENAMES.iter().map(move |name| base.join(name)))
            .find(|candidate| candidate.is_file())
    })
}
