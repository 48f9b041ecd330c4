// Output formatting utilities

use crate::editor::{Editor, SuggestionResponse};
use crate::filter::rule::{format_path, Condition, LogicalOp, Rule, Value};
use crate::terms::TermIndex;
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Apply bold formatting if in TTY mode
fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

fn describe_condition(condition: &Condition) -> String {
    let column = condition.display_column();
    match &condition.value {
        Value::Bool(true) => column.to_string(),
        Value::Bool(false) => format!("!{}", column),
        Value::Scalar(text) => format!("{} {} {}", column, condition.op.symbol(), text),
        Value::List(items) => format!("{} {} ({})", column, condition.op.symbol(), items.join(" | ")),
    }
}

fn chain_name(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::All => "ALL",
        LogicalOp::Any => "ANY",
        LogicalOp::None => "NONE",
    }
}

/// Indented tree view, each node prefixed with its edit path
pub fn format_rule_tree(rule: &Rule) -> String {
    let mut lines = Vec::new();
    let mut path = Vec::new();
    push_tree_lines(rule, &mut path, &mut lines);
    lines.join("\n")
}

fn push_tree_lines(rule: &Rule, path: &mut Vec<usize>, lines: &mut Vec<String>) {
    let indent = "  ".repeat(path.len());
    let label = if path.is_empty() {
        "root".to_string()
    } else {
        format_path(path)
    };

    match rule {
        Rule::Condition(condition) => {
            lines.push(format!("{}[{}] {}", indent, label, describe_condition(condition)));
        }
        Rule::Chain(chain) => {
            lines.push(format!("{}[{}] {}", indent, label, chain_name(chain.op)));
            for (index, child) in chain.children.iter().enumerate() {
                path.push(index);
                push_tree_lines(child, path, lines);
                path.pop();
            }
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 3 {
        return text.chars().take(width).collect();
    }
    let kept: String = text.chars().take(width - 3).collect();
    format!("{}...", kept)
}

/// Term index as a table, fitted to `width` by shrinking the text columns
pub fn format_terms_table(index: &TermIndex, width: usize) -> String {
    if index.is_empty() {
        return "No terms.".to_string();
    }

    let headers = ["#", "Kind", "Raw", "Label", "Path", "Offset", "Pair"];
    let rows: Vec<[String; 7]> = index
        .tokens()
        .iter()
        .enumerate()
        .map(|(i, token)| {
            [
                i.to_string(),
                token.kind.to_string(),
                token.raw.clone(),
                token.label.clone(),
                token.path.as_ref().map(|p| p.to_string()).unwrap_or_default(),
                token.source_offset.map(|o| o.to_string()).unwrap_or_default(),
                token.counterpart.map(|c| c.to_string()).unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (col, cell) in row.iter().enumerate() {
            widths[col] = widths[col].max(cell.chars().count());
        }
    }

    // Label, then raw text, give way on narrow terminals
    let separators = 2 * (headers.len() - 1);
    let total: usize = widths.iter().sum::<usize>() + separators;
    let mut excess = total.saturating_sub(width);
    for col in [3, 2] {
        let cut = widths[col].saturating_sub(5).min(excess);
        widths[col] -= cut;
        excess -= cut;
    }

    let tty = is_tty();
    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<w$}", truncate(cell, *w), w = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut lines = vec![bold_if_tty(&format_row(&header[..]), tty)];
    lines.extend(rows.iter().map(|row| format_row(&row[..])));
    lines.join("\n")
}

/// Summary of an editor after replaying keystrokes
pub fn format_editor_state(editor: &Editor) -> String {
    let terms: Vec<String> = editor
        .terms()
        .tokens()
        .iter()
        .map(|token| format!("{}:{}", token.kind, token.raw))
        .collect();
    let status = match editor.syntax_error() {
        Some(message) => format!("invalid ({})", message),
        None => "valid".to_string(),
    };

    [
        format!("terms: {}", terms.join(" ")),
        format!("fragment: {}", editor.fragment()),
        format!("expect: {}", editor.expect().term_kind()),
        format!("status: {}", status),
        format!("query: {}", editor.query()),
    ]
    .join("\n")
}

pub fn format_suggestions(response: &SuggestionResponse) -> String {
    let mut lines: Vec<String> = response
        .items
        .iter()
        .map(|item| {
            if item.label == item.search {
                item.search.clone()
            } else {
                format!("{}\t{}", item.search, item.label)
            }
        })
        .collect();
    if let Some(default) = &response.default {
        lines.push(format!("{} (default)", default.search));
    }
    if lines.is_empty() {
        return "No suggestions.".to_string();
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_filter;

    #[test]
    fn test_format_rule_tree() {
        let rule = parse_filter("host=web*&(state=2|!ack)").unwrap();
        assert_eq!(
            format_rule_tree(&rule),
            "[root] ALL\n  [0] host = web*\n  [1] ANY\n    [1-0] state = 2\n    [1-1] !ack"
        );
    }

    #[test]
    fn test_format_terms_table_fits_width() {
        let index = TermIndex::parse("description=a%20very%20long%20value%20that%20needs%20room").unwrap();
        let table = format_terms_table(&index, 60);
        for line in table.lines() {
            assert!(line.chars().count() <= 60 || line.contains('\x1b'), "line too long: {}", line);
        }
        assert!(table.contains("..."));
        assert_eq!(format_terms_table(&TermIndex::new(), 80), "No terms.");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 10), "abcdef");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
        assert_eq!(truncate("abcdef", 2), "ab");
    }
}
