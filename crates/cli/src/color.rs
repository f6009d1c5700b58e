// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal ANSI coloring for list and status views.

use std::sync::atomic::{AtomicBool, Ordering};

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);

/// Disable color globally (`--no-color` or non-tty output).
pub fn disable() {
    COLOR_ENABLED.store(false, Ordering::SeqCst);
}

pub fn enabled() -> bool {
    COLOR_ENABLED.load(Ordering::SeqCst)
}

fn wrap(code: &str, text: &str) -> String {
    if enabled() {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

pub fn green(text: &str) -> String {
    wrap("32", text)
}

pub fn yellow(text: &str) -> String {
    wrap("33", text)
}

pub fn red(text: &str) -> String {
    wrap("31", text)
}

pub fn muted(text: &str) -> String {
    wrap("2", text)
}

/// Color a status word by severity: greens for healthy/terminal-success,
/// yellows for in-flight, reds for failure states.
pub fn status(text: &str) -> String {
    match text {
        "completed" | "idle" | "healthy" | "ok" => green(text),
        "pending" | "processing" | "busy" | "created" | "warning" => yellow(text),
        "failed" | "cancelled" | "hung" | "dead" | "error" => red(text),
        _ => text.to_string(),
    }
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
