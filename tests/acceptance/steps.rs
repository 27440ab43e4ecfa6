use crate::SyncWorld;
use crate::fake_tracker::WriteCall;
use cucumber::gherkin::Step;
use cucumber::{given, then, when};
use todo_jira_sync::config::ConfigKey;
use todo_jira_sync::jira::issues::{RemoteStatus, UserRef};
use todo_jira_sync::jira::sync::{self, ItemOutcome, SyncMode, Tracker};
use todo_jira_sync::markdown_parser::parse_checklist;

fn docstring(step: &Step) -> String {
    step.docstring
        .as_ref()
        .expect("Expected docstring")
        .trim()
        .to_string()
}

fn last_run_writes(world: &SyncWorld) -> Vec<WriteCall> {
    world.tracker.writes()[world.writes_before_last_run..].to_vec()
}

async fn synchronize(world: &mut SyncWorld, mode: SyncMode) {
    let items = parse_checklist(&world.todo_content)
        .unwrap_or_else(|e| panic!("Failed to parse TODO content: {e}"));

    let parent = world
        .tracker
        .fetch_issue(&world.parent)
        .await
        .unwrap_or_else(|e| panic!("Failed to fetch parent issue: {e}"));

    world.writes_before_last_run = world.tracker.writes().len();
    let report = sync::reconcile(&world.tracker, &parent, &items, mode).await;

    let mut output = String::new();
    for item in &report.items {
        output.push_str(&item.to_string());
        output.push('\n');
    }
    output.push_str(&report.summary_line());
    world.captured_output = output.into_bytes();
    world.last_report = Some(report);
}

#[given(regex = r#"^the parent issue "([^"]+)" exists$"#)]
async fn given_parent_issue_exists(world: &mut SyncWorld, key: String) {
    world.parent = key;
}

#[given(regex = r#"^the parent issue was reported by "([^"]+)"$"#)]
async fn given_parent_reporter(world: &mut SyncWorld, name: String) {
    world.tracker.set_reporter(&name);
}

#[when(regex = r#"^someone assigns "([^"]+)" to "([^"]+)" in JIRA$"#)]
async fn when_assigned_by_hand(world: &mut SyncWorld, summary: String, name: String) {
    world.tracker.reassign_by_hand(&summary, &name);
}

#[given("the TODO file contains:")]
async fn given_todo_file_contains(world: &mut SyncWorld, step: &Step) {
    world.todo_content = docstring(step);
}

#[when("the TODO file changes to:")]
async fn when_todo_file_changes(world: &mut SyncWorld, step: &Step) {
    world.todo_content = docstring(step);
}

#[given("the parent issue has no sub-tasks")]
async fn given_no_subtasks(world: &mut SyncWorld) {
    assert_eq!(world.tracker.subtask_count(), 0);
}

#[given(regex = r#"^looking up "([^"]+)" fails with a network error$"#)]
async fn given_lookup_fails(world: &mut SyncWorld, summary: String) {
    world.tracker.fail_lookup(&summary);
}

#[when("I synchronize the TODO file")]
async fn when_synchronize(world: &mut SyncWorld) {
    synchronize(world, SyncMode::Apply).await;
}

#[when("I synchronize the TODO file again")]
async fn when_synchronize_again(world: &mut SyncWorld) {
    synchronize(world, SyncMode::Apply).await;
}

#[when("I synchronize the TODO file as a dry run")]
async fn when_synchronize_dry_run(world: &mut SyncWorld) {
    synchronize(world, SyncMode::DryRun).await;
}

#[then(regex = r#"^exactly (\d+) sub-tasks? should be created$"#)]
async fn then_subtasks_created(world: &mut SyncWorld, count: usize) {
    let created = world
        .tracker
        .writes()
        .iter()
        .filter(|call| matches!(call, WriteCall::Create(_)))
        .count();
    assert_eq!(created, count);
}

#[then(regex = r#"^the created sub-task summary should contain "([^"]+)"$"#)]
async fn then_created_summary_contains(world: &mut SyncWorld, fragment: String) {
    let summaries: Vec<String> = world
        .tracker
        .writes()
        .into_iter()
        .filter_map(|call| match call {
            WriteCall::Create(summary) => Some(summary),
            _ => None,
        })
        .collect();
    assert!(
        summaries.iter().any(|s| s.contains(&fragment)),
        "No created summary contains '{fragment}': {summaries:?}"
    );
}

#[then(regex = r#"^the sub-task "([^"]+)" should have status "([^"]+)"$"#)]
async fn then_subtask_has_status(world: &mut SyncWorld, summary: String, status: String) {
    let expected = match status.as_str() {
        "To Do" => RemoteStatus::ToDo,
        "In Progress" => RemoteStatus::InProgress,
        "Done" => RemoteStatus::Done,
        other => panic!("Unknown status '{other}'"),
    };
    let subtask = world
        .tracker
        .subtask(&summary)
        .unwrap_or_else(|| panic!("No sub-task with summary '{summary}'"));
    assert_eq!(subtask.status, expected);
}

#[then(regex = r#"^the sub-task "([^"]+)" should be assigned to "([^"]+)"$"#)]
async fn then_subtask_assigned(world: &mut SyncWorld, summary: String, name: String) {
    let subtask = world
        .tracker
        .subtask(&summary)
        .unwrap_or_else(|| panic!("No sub-task with summary '{summary}'"));
    assert_eq!(subtask.assignee, Some(UserRef::Name(name)));
}

#[then(regex = r#"^the last run should make exactly (\d+) assignee changes?$"#)]
async fn then_assignee_changes(world: &mut SyncWorld, count: usize) {
    let writes = last_run_writes(world);
    let changes = writes
        .iter()
        .filter(|call| matches!(call, WriteCall::Assign(..)))
        .count();
    assert_eq!(changes, count, "Writes: {writes:?}");
}

#[then("the last run should make no write calls")]
async fn then_no_writes(world: &mut SyncWorld) {
    let writes = last_run_writes(world);
    assert!(writes.is_empty(), "Unexpected writes: {writes:?}");
}

#[then("the last run should make no create calls")]
async fn then_no_creates(world: &mut SyncWorld) {
    let writes = last_run_writes(world);
    assert!(
        !writes.iter().any(|call| matches!(call, WriteCall::Create(_))),
        "Unexpected creates: {writes:?}"
    );
}

#[then(regex = r#"^the last run should make exactly (\d+) status updates?$"#)]
async fn then_status_updates(world: &mut SyncWorld, count: usize) {
    let writes = last_run_writes(world);
    let updates = writes
        .iter()
        .filter(|call| matches!(call, WriteCall::SetStatus(..)))
        .count();
    assert_eq!(updates, count, "Writes: {writes:?}");
}

#[then(regex = r#"^the last run should report (\d+) unchanged items?$"#)]
async fn then_unchanged_items(world: &mut SyncWorld, count: usize) {
    let report = world.last_report.as_ref().expect("No sync has run");
    assert_eq!(report.unchanged(), count);
}

#[then(regex = r#"^item "([^"]+)" should be reported as failed$"#)]
async fn then_item_failed(world: &mut SyncWorld, number: String) {
    let report = world.last_report.as_ref().expect("No sync has run");
    let item = report
        .items
        .iter()
        .find(|item| item.number == number)
        .unwrap_or_else(|| panic!("Item {number} missing from report"));
    assert!(
        matches!(item.outcome, ItemOutcome::Failed { .. }),
        "Item {number} outcome: {:?}",
        item.outcome
    );
}

#[given(regex = r#"^a project directory with a TODO\.md containing "(.*)"$"#)]
async fn given_project_directory(world: &mut SyncWorld, content: String) {
    let dir = tempfile::tempdir().expect("Failed to create project directory");
    std::fs::write(dir.path().join("TODO.md"), content).expect("Failed to write TODO.md");
    world.project_dir = Some(dir);
}

#[given("the project config.yaml contains:")]
async fn given_project_config(world: &mut SyncWorld, step: &Step) {
    let dir = world.project_dir.as_ref().expect("No project directory");
    std::fs::write(dir.path().join("config.yaml"), docstring(step))
        .expect("Failed to write config.yaml");
}

#[when(regex = r"^I run `todo-jira-sync ?([^`]*)` in the project directory$")]
async fn when_run_binary(world: &mut SyncWorld, args: String) {
    let dir = world.project_dir.as_ref().expect("No project directory");
    let binary = env!("CARGO_BIN_EXE_todo-jira-sync");

    let mut command = std::process::Command::new(binary);
    command.args(args.split_whitespace()).current_dir(dir.path());
    for key in ConfigKey::all() {
        command.env_remove(key.env_var());
    }

    let output = command
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute {binary}: {e}"));
    world.captured_output = output.stdout;
    world.captured_error = output.stderr;
    world.command_status = Some(output.status);
}

#[then("the command should fail")]
async fn then_command_fails(world: &mut SyncWorld) {
    let status = world.command_status.expect("Command was not run");
    assert!(!status.success(), "Command unexpectedly succeeded");
}

#[then("the command should succeed")]
async fn then_command_succeeds(world: &mut SyncWorld) {
    let status = world.command_status.expect("Command was not run");
    assert!(
        status.success(),
        "Command failed: {}",
        String::from_utf8_lossy(&world.captured_error)
    );
}

#[then(regex = r#"^the error output should contain "(.*)"$"#)]
async fn then_error_output_contains(world: &mut SyncWorld, expected: String) {
    let error = String::from_utf8_lossy(&world.captured_error);
    assert!(
        error.contains(&expected),
        "Expected error output to contain '{expected}', got:\n{error}"
    );
}

#[then(regex = r"^the output should contain '(.*)'$")]
async fn then_output_contains(world: &mut SyncWorld, expected: String) {
    let output = String::from_utf8_lossy(&world.captured_output);
    assert!(
        output.contains(&expected),
        "Expected output to contain '{expected}', got:\n{output}"
    );
}
