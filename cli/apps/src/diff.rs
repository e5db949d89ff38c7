//! Change preview shown before a workload is created or updated.

use crate::error::CliError;
use crate::printer;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};

/// Lines of unchanged context kept around each change.
const CONTEXT_LINES: usize = 4;

const ELISION: &str = "...";

/// Render a line diff between the current and desired resource.
///
/// Both sides are rendered as YAML documents with server managed fields and
/// status removed. A missing `current` shows every line as added. Returns
/// the rendered diff and whether both sides are identical.
pub fn resource_diff<T: Serialize>(current: Option<&T>, desired: &T, color: bool) -> Result<(String, bool), CliError> {
    let old = match current {
        Some(current) => printer::yaml_document(&printer::clean_resource(current)?)?,
        None => String::new(),
    };
    let new = printer::yaml_document(&printer::clean_resource(desired)?)?;

    if old == new {
        return Ok((String::new(), true));
    }
    Ok((render(&old, &new, color), false))
}

fn render(old: &str, new: &str, color: bool) -> String {
    let diff = TextDiff::from_lines(old, new);
    let groups = diff.grouped_ops(CONTEXT_LINES);
    let (old_len, new_len) = (diff.old_slices().len(), diff.new_slices().len());
    let mut lines: Vec<String> = Vec::new();

    for (i, group) in groups.iter().enumerate() {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        if i > 0 || first.old_range().start > 0 || first.new_range().start > 0 {
            lines.push(ELISION.to_string());
        }

        for op in group {
            for change in diff.iter_changes(op) {
                let text = change.value().trim_end_matches(['\n', '\r']);
                let line = match change.tag() {
                    ChangeTag::Equal => format!(
                        "{:3},{:3}   |{}",
                        change.old_index().map_or(0, |i| i + 1),
                        change.new_index().map_or(0, |i| i + 1),
                        text
                    ),
                    ChangeTag::Delete => {
                        let line = format!("{:3}     - |{}", change.old_index().map_or(0, |i| i + 1), text);
                        paint(&line, color, nu_ansi_term::Color::Red)
                    }
                    ChangeTag::Insert => {
                        let line = format!("    {:3} + |{}", change.new_index().map_or(0, |i| i + 1), text);
                        paint(&line, color, nu_ansi_term::Color::Green)
                    }
                };
                lines.push(line);
            }
        }

        let is_last = i + 1 == groups.len();
        if is_last && (last.old_range().end < old_len || last.new_range().end < new_len) {
            lines.push(ELISION.to_string());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn paint(line: &str, color: bool, c: nu_ansi_term::Color) -> String {
    if color { c.paint(line).to_string() } else { line.to_string() }
}
