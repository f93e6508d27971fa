//! Output formatting utilities for CLI commands
//!
//! Provides consistent formatting for:
//! - Tables with column alignment
//! - Money amounts and percentages
//! - Relative timestamps

use chrono::{DateTime, Duration, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, Color, ContentArrangement, Table};

/// Format an amount with thousands separators and no decimals
///
/// Examples:
/// - 0.0 -> "0"
/// - 1234567.4 -> "1,234,567"
/// - -742500.0 -> "-742,500"
pub fn format_money(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a ratio as a percentage with one decimal ("0.2" -> "20.0%")
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Format a timestamp relative to `now`
///
/// Examples:
/// - "2 seconds ago"
/// - "5 minutes ago"
/// - "2026-10-01 14:30" (if older than a week)
pub fn format_age(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(time);
    if elapsed < Duration::zero() {
        return "just now".to_string();
    }

    let secs = elapsed.num_seconds();
    if secs < 60 {
        format!("{} second{} ago", secs, if secs == 1 { "" } else { "s" })
    } else if secs < 3600 {
        let mins = secs / 60;
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if secs < 86400 {
        let hours = secs / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if secs < 604800 {
        let days = secs / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        time.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Green for positive, red for negative, none for zero
pub fn color_for_amount(amount: f64) -> Option<Color> {
    if amount > 0.0 {
        Some(Color::Green)
    } else if amount < 0.0 {
        Some(Color::Red)
    } else {
        None
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);
    table
}

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = new_table(headers);
    for row in rows {
        table.add_row(row);
    }
    println!("{}", table);
}

/// Print a table with per-cell colors
pub fn print_table_colored(headers: &[&str], rows: Vec<Vec<(String, Option<Color>)>>) {
    let mut table = new_table(headers);
    for row in rows {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|(text, color)| {
                let cell = Cell::new(text);
                if let Some(c) = color {
                    cell.fg(c)
                } else {
                    cell
                }
            })
            .collect();
        table.add_row(cells);
    }
    println!("{}", table);
}

/// Print a table whose first column is a label and the rest are amounts.
/// Amount cells are right-aligned; colored ones carry a color.
pub fn print_amount_table(headers: &[&str], rows: Vec<(String, Vec<(f64, Option<Color>)>)>) {
    let mut table = new_table(headers);
    for (label, amounts) in rows {
        let mut cells = vec![Cell::new(label)];
        cells.extend(amounts.into_iter().map(|(amount, color)| {
            let cell = Cell::new(format_money(amount)).set_alignment(CellAlignment::Right);
            match color {
                Some(c) => cell.fg(c),
                None => cell,
            }
        }));
        table.add_row(cells);
    }
    println!("{}", table);
}
