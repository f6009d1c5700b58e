// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn plain_table() -> Table {
    crate::color::disable();
    Table::new(vec![
        Column::left("ID"),
        Column::status("STATUS"),
        Column::right("COUNT"),
    ])
}

#[test]
fn header_and_rows_align() {
    let mut table = plain_table();
    table.add_row(vec!["1".into(), "pending".into(), "10".into()]);
    table.add_row(vec!["142".into(), "completed".into(), "3".into()]);

    let rendered = table.render();
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("ID   STATUS"));
    assert!(lines[1].starts_with("1    pending"));
    assert!(lines[2].starts_with("142  completed"));
    // Right alignment for the numeric column.
    assert!(lines[1].ends_with("10"));
    assert!(lines[2].ends_with(" 3"));
}

#[test]
fn long_values_are_truncated_with_ellipsis() {
    crate::color::disable();
    let mut table = Table::new(vec![Column::left("PATH").with_max_width(10)]);
    table.add_row(vec!["slides/week1/slides_introduction.py".into()]);

    let rendered = table.render();
    assert!(rendered.contains("slides/we…"));
}

#[test]
fn missing_cells_render_empty() {
    let mut table = plain_table();
    table.add_row(vec!["1".into()]);
    let rendered = table.render();
    assert_eq!(rendered.lines().count(), 2);
}

#[test]
fn empty_table_reports_empty() {
    let table = plain_table();
    assert!(table.is_empty());
}
