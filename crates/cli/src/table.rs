// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared table renderer for CLI list views.
//!
//! Provides consistent column alignment, color application, and truncation
//! across all `cb * list` and status commands.

use crate::color;

/// Column text alignment.
pub enum Align {
    Left,
    Right,
}

/// How a cell's text is styled after padding.
pub enum CellStyle {
    /// No color applied.
    Plain,
    /// Apply [`color::muted()`].
    Muted,
    /// Apply [`color::status()`].
    Status,
}

/// A column definition in a [`Table`].
pub struct Column {
    pub name: &'static str,
    pub align: Align,
    pub style: CellStyle,
    /// Maximum width (`None` = unlimited). Values exceeding this are truncated.
    pub max_width: Option<usize>,
}

impl Column {
    /// Left-aligned, plain style.
    pub fn left(name: &'static str) -> Self {
        Self {
            name,
            align: Align::Left,
            style: CellStyle::Plain,
            max_width: None,
        }
    }

    /// Right-aligned, plain style.
    pub fn right(name: &'static str) -> Self {
        Self {
            name,
            align: Align::Right,
            style: CellStyle::Plain,
            max_width: None,
        }
    }

    /// Left-aligned, muted style.
    pub fn muted(name: &'static str) -> Self {
        Self {
            name,
            align: Align::Left,
            style: CellStyle::Muted,
            max_width: None,
        }
    }

    /// Left-aligned, status style.
    pub fn status(name: &'static str) -> Self {
        Self {
            name,
            align: Align::Left,
            style: CellStyle::Status,
            max_width: None,
        }
    }

    pub fn with_max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }
}

/// Fixed-column table with header row.
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render to a string, one line per row plus the header.
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.len()).collect();
        let mut cells: Vec<Vec<String>> = Vec::with_capacity(self.rows.len());

        for row in &self.rows {
            let mut rendered = Vec::with_capacity(self.columns.len());
            for (i, column) in self.columns.iter().enumerate() {
                let raw = row.get(i).cloned().unwrap_or_default();
                let truncated = match column.max_width {
                    Some(max) if raw.chars().count() > max && max > 1 => {
                        let kept: String = raw.chars().take(max - 1).collect();
                        format!("{kept}…")
                    }
                    _ => raw,
                };
                widths[i] = widths[i].max(truncated.len());
                rendered.push(truncated);
            }
            cells.push(rendered);
        }

        let mut out = String::new();
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            out.push_str(&pad(column.name, widths[i], &Align::Left));
        }
        out.push('\n');

        for row in &cells {
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    out.push_str("  ");
                }
                let padded = pad(&row[i], widths[i], &column.align);
                // Style after padding so escape codes do not skew widths.
                let styled = match column.style {
                    CellStyle::Plain => padded,
                    CellStyle::Muted => color::muted(&padded),
                    CellStyle::Status => {
                        let fill = " ".repeat(widths[i].saturating_sub(row[i].len()));
                        format!("{}{fill}", color::status(&row[i]))
                    }
                };
                out.push_str(&styled);
            }
            out.push('\n');
        }
        out
    }
}

fn pad(text: &str, width: usize, align: &Align) -> String {
    let padding = width.saturating_sub(text.len());
    match align {
        Align::Left => format!("{text}{}", " ".repeat(padding)),
        Align::Right => format!("{}{text}", " ".repeat(padding)),
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
