//! Plain-text table rendering for the audit and report commands.
//!
//! Columns whose cells are all numbers (or the `-` placeholder) are
//! right-aligned; everything else is left-aligned. Embedded newlines and tabs
//! are flattened so each row stays on one line.

use std::borrow::Cow;
use std::fmt::Write as _;

const SEPARATOR: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h).max(3)).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(&flatten(cell)));
        }
    }
    let aligns: Vec<Align> = (0..column_count)
        .map(|idx| column_alignment(rows, idx))
        .collect();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &aligns));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(output, "{}", format_row(&rule, &widths, &aligns));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn column_alignment(rows: &[Vec<String>], idx: usize) -> Align {
    let mut saw_number = false;
    for cell in rows.iter().filter_map(|row| row.get(idx)) {
        let trimmed = cell.trim();
        if trimmed.is_empty() || trimmed == "-" {
            continue;
        }
        if trimmed.parse::<f64>().is_err() {
            return Align::Left;
        }
        saw_number = true;
    }
    if saw_number { Align::Right } else { Align::Left }
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let cells: Vec<String> = values
        .iter()
        .zip(widths.iter().zip(aligns))
        .map(|(value, (&width, &align))| {
            let text = flatten(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&text)));
            match align {
                Align::Left => format!("{text}{padding}"),
                Align::Right => format!("{padding}{text}"),
            }
        })
        .collect();
    cells.join(SEPARATOR).trim_end().to_string()
}

/// Character count, ignoring ANSI colour sequences.
fn display_width(value: &str) -> usize {
    let mut width = 0;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn flatten(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace("\r\n", " ").replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
