use crate::checklist::{ChecklistItem, ItemStatus, Section};
use crate::error::SyncError;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// `1.1 [DONE] Description`, the form used inside bullet lists.
static MARKER_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*)\s+\[([A-Za-z_]+)\]\s+(.+)$").expect("valid checklist pattern")
});

/// `1.1: Description [DONE]`
static MARKER_LAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*):\s*(.+?)\s*\[([A-Za-z_]+)\]$").expect("valid checklist pattern")
});

/// `1. Architecture` written as a heading.
static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.+)$").expect("valid section pattern"));

#[derive(Debug, Clone, Copy, PartialEq)]
enum LineKind {
    Plain,
    Heading,
    /// First line of an entry in a top-level ordered list, with its number.
    OrderedEntry(u64),
}

#[derive(Debug, PartialEq)]
struct Line {
    text: String,
    kind: LineKind,
}

/// Flattens markdown into logical lines of plain text.
///
/// Inline formatting is dropped, code blocks are skipped, and every line
/// break, paragraph, list item or heading boundary ends a line.
fn logical_lines(content: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut buffer = String::new();
    let mut kind = LineKind::Plain;
    // Next entry number of each open list; `None` for bullet lists.
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut in_code_block = false;

    let mut flush = |buffer: &mut String, kind: &mut LineKind| {
        let text = buffer.trim();
        if !text.is_empty() {
            lines.push(Line {
                text: text.to_string(),
                kind: *kind,
            });
        }
        buffer.clear();
        *kind = LineKind::Plain;
    };

    for event in Parser::new_ext(content, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                flush(&mut buffer, &mut kind);
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(text) | Event::Code(text) if !in_code_block => buffer.push_str(&text),
            Event::SoftBreak | Event::HardBreak => flush(&mut buffer, &mut kind),
            Event::Start(Tag::List(start)) => {
                flush(&mut buffer, &mut kind);
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                flush(&mut buffer, &mut kind);
                lists.pop();
            }
            Event::Start(Tag::Item) => {
                flush(&mut buffer, &mut kind);
                let depth = lists.len();
                if let Some(Some(next)) = lists.last_mut() {
                    if depth == 1 {
                        kind = LineKind::OrderedEntry(*next);
                    }
                    *next += 1;
                }
            }
            Event::Start(Tag::Heading { .. }) => {
                flush(&mut buffer, &mut kind);
                kind = LineKind::Heading;
            }
            Event::End(TagEnd::Item | TagEnd::Heading(_) | TagEnd::Paragraph) => {
                flush(&mut buffer, &mut kind)
            }
            _ => (),
        }
    }
    flush(&mut buffer, &mut kind);

    lines
}

enum LineMatch {
    Item {
        number: String,
        marker: String,
        description: String,
    },
    NotAnItem,
}

fn match_item(text: &str) -> LineMatch {
    if let Some(caps) = MARKER_FIRST.captures(text) {
        return LineMatch::Item {
            number: caps[1].to_string(),
            marker: caps[2].to_string(),
            description: caps[3].trim().to_string(),
        };
    }
    if let Some(caps) = MARKER_LAST.captures(text) {
        return LineMatch::Item {
            number: caps[1].to_string(),
            marker: caps[3].to_string(),
            description: caps[2].trim().to_string(),
        };
    }
    LineMatch::NotAnItem
}

fn section_from(line: &Line) -> Option<Section> {
    match line.kind {
        LineKind::Heading => SECTION_HEADING.captures(&line.text).map(|caps| Section {
            number: caps[1].to_string(),
            title: caps[2].trim().to_string(),
        }),
        LineKind::OrderedEntry(number) => Some(Section {
            number: number.to_string(),
            title: line.text.clone(),
        }),
        LineKind::Plain => None,
    }
}

/// Extracts checklist items in document order.
///
/// Fails with [`SyncError::Parse`] when nothing in `content` looks like a
/// checklist item.
pub fn parse_checklist(content: &str) -> Result<Vec<ChecklistItem>, SyncError> {
    let (items, _) = logical_lines(content).into_iter().fold(
        (Vec::new(), None::<Section>),
        |(mut items, section), line| match match_item(&line.text) {
            LineMatch::Item {
                number,
                marker,
                description,
            } => {
                match ItemStatus::from_marker(&marker) {
                    Some(status) => items.push(ChecklistItem {
                        number,
                        description,
                        status,
                        section: section.clone(),
                    }),
                    None => warn!(item = %number, marker = %marker, "skipping item with unknown status marker"),
                }
                (items, section)
            }
            LineMatch::NotAnItem => {
                let section = section_from(&line).or(section);
                (items, section)
            }
        },
    );

    if items.is_empty() {
        return Err(SyncError::Parse(
            "no checklist items with [DONE], [PENDING] or [IN_PROGRESS] markers found".to_string(),
        ));
    }
    debug!(count = items.len(), "parsed checklist");
    Ok(items)
}

pub fn parse_checklist_file(path: &Path) -> Result<Vec<ChecklistItem>, SyncError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SyncError::Parse(format!("cannot read {}: {e}", path.display())))?;
    parse_checklist(&content).map_err(|err| match err {
        SyncError::Parse(reason) => SyncError::Parse(format!("{}: {reason}", path.display())),
        other => other,
    })
}
