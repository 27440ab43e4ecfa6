use std::path::PathBuf;

/// Enum representing CLI commands
#[derive(Debug, PartialEq)]
pub enum Command {
    Sync {
        todo: Option<PathBuf>,
        dry_run: bool,
    },
    Whoami,
    Help,
    Unknown(String),
}

pub const USAGE: &str = "Usage:
  todo-jira-sync [sync] [--dry-run] [--todo <path>]   sync TODO checklist items into JIRA sub-tasks
  todo-jira-sync whoami                               show the JIRA user of the configured credentials
  todo-jira-sync help                                 show this message";

/// Parse command line arguments and return a Command
///
/// # Arguments
/// * `args` - Command line arguments (including program name)
///
/// # Returns
/// * `Command` - The parsed command. No arguments means a sync run.
pub fn parse_args(args: &[String]) -> Command {
    let rest = args.get(1..).unwrap_or_default();
    match rest.first().map(String::as_str) {
        None => parse_sync_options(&[]),
        Some("help" | "--help" | "-h") => Command::Help,
        Some("whoami") if rest.len() == 1 => Command::Whoami,
        Some("sync") => parse_sync_options(&rest[1..]),
        Some(option) if option.starts_with("--") => parse_sync_options(rest),
        Some(cmd) => Command::Unknown(cmd.to_string()),
    }
}

fn parse_sync_options(options: &[String]) -> Command {
    let mut todo = None;
    let mut dry_run = false;
    let mut iter = options.iter();

    while let Some(option) = iter.next() {
        match option.as_str() {
            "--dry-run" => dry_run = true,
            "--todo" => match iter.next() {
                Some(path) if !path.starts_with("--") => todo = Some(PathBuf::from(path)),
                _ => {
                    return Command::Unknown(
                        "Missing path argument. Usage: todo-jira-sync --todo <path>".to_string(),
                    );
                }
            },
            other => return Command::Unknown(other.to_string()),
        }
    }

    Command::Sync { todo, dry_run }
}
