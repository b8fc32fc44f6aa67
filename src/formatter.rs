//! Terminal rendering of rows

use crate::filter::glob::glob_match;
use crate::row::{Row, canonical_string};
use colored::{ColoredString, Colorize};
use std::fmt::Write;

const DIVIDER: &str = "**********";

/// Which fields to print and which to highlight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatParams {
    /// Fields to print, in order. Entries may be globs; `!glob` excludes.
    /// Empty prints every field sorted by name.
    pub output_fields: Vec<String>,
    /// Fields printed with accent colors (globs allowed)
    pub accent_fields: Vec<String>,
}

impl Default for FormatParams {
    fn default() -> Self {
        Self {
            output_fields: Vec::new(),
            accent_fields: vec![
                "message".to_string(),
                "module".to_string(),
                "request_system".to_string(),
            ],
        }
    }
}

/// Parse a comma-separated field list. Empty or `*` means "no selection".
pub fn parse_field_list(list: &str) -> Option<Vec<String>> {
    let list = list.trim();
    if list.is_empty() || list == "*" {
        return None;
    }
    Some(
        list.split(',')
            .map(|field| field.trim().to_string())
            .filter(|field| !field.is_empty())
            .collect(),
    )
}

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    params: FormatParams,
}

impl Formatter {
    pub fn new(params: FormatParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FormatParams {
        &self.params
    }

    pub fn format(&self, row: &Row) -> String {
        let mut text = format!("{DIVIDER} {} {DIVIDER}\n", header(row));

        match row.error() {
            Some(err) => {
                let _ = writeln!(text, "{}", format!("row error: {err}").red());
            }
            None => {
                for field in self.select_fields(row) {
                    let value = row.get(field).map(canonical_string).unwrap_or_default();
                    let accent = self
                        .params
                        .accent_fields
                        .iter()
                        .any(|pattern| glob_match(pattern, field));
                    let (field, value) = if accent {
                        (field.bright_blue().bold(), value.bright_green())
                    } else {
                        (field.bright_blue(), value.green())
                    };
                    let _ = writeln!(text, "   {field}: {value}");
                }
            }
        }

        text.push_str(DIVIDER);
        text
    }

    /// Field names to print for `row`, in output order
    pub fn select_fields<'a>(&self, row: &'a Row) -> Vec<&'a str> {
        let mut keys: Vec<&str> = row.data().keys().map(String::as_str).collect();
        keys.sort_unstable();

        let (excludes, includes): (Vec<&str>, Vec<&str>) = self
            .params
            .output_fields
            .iter()
            .map(String::as_str)
            .partition(|field| field.starts_with('!'));

        let mut selected = if includes.is_empty() {
            keys
        } else {
            let mut selected = Vec::new();
            for pattern in includes {
                for key in &keys {
                    if glob_match(pattern, key) && !selected.contains(key) {
                        selected.push(*key);
                    }
                }
            }
            selected
        };

        selected.retain(|key| !excludes.iter().any(|ex| glob_match(&ex[1..], key)));
        selected
    }
}

fn header(row: &Row) -> ColoredString {
    let Some(level) = row.get("level").and_then(|level| level.as_str()) else {
        return "No level field".normal();
    };
    let label = format!("  Level: {level}  ").black();
    match level.to_lowercase().as_str() {
        "debug" => label.on_cyan(),
        "info" => label.on_green(),
        "warn" | "warning" => label.on_bright_yellow(),
        "error" => label.on_red(),
        _ => label.on_magenta(),
    }
}
