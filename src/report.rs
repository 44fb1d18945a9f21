// src/report.rs

//! Presenting judge results.
//!
//! Two outputs:
//! - A JSON document with every retained field (`--json`)
//! - Plain-text key/value tables for the terminal
//!
//! Neither shape is part of the judging contract; they only read the
//! public fields of [`JudgeResult`].

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;

use crate::config::TableConfig;
use crate::engine::{JudgeResult, Role, Verdict};
use crate::process::ExecutionResult;
use crate::util::ensure_dir;

const CONSOLE_WIDTH: usize = 80;
const KEY_WIDTH: usize = CONSOLE_WIDTH / 4 - 3;
const VALUE_WIDTH: usize = CONSOLE_WIDTH - CONSOLE_WIDTH / 4 + 3;

/* ---------------- JSON ---------------- */

/// Build the JSON report for a run.
///
/// `include_io` = false blanks every stdout/stderr field.
pub fn build_report(results: &[JudgeResult], include_io: bool) -> Result<Value> {
    let mut compiler_output = serde_json::Map::new();
    if let Some(first) = results.first() {
        for role in Role::ALL {
            let entry = match &first.phase(role).compile {
                Some(c) => json!({
                    "exit_code": c.exit_code,
                    "output": c.diagnostic_text,
                }),
                None => Value::Null,
            };
            compiler_output.insert(role.name().to_string(), entry);
        }
    }

    let mut judged = Vec::with_capacity(results.len());
    for (idx, result) in results.iter().enumerate() {
        let mut status = serde_json::Map::new();
        for role in Role::ALL {
            let entry = match &result.phase(role).execution {
                Some(run) => execution_json(run, include_io),
                None => Value::Null,
            };
            status.insert(role.name().to_string(), entry);
        }

        judged.push(json!({
            "judge_id": idx,
            "hash": result.digest().context("Failed to hash judge result")?,
            "execution_status": Value::Object(status),
            "verdict": result.verdict().code(),
            "verdict_text": result.verdict().description(),
            "display_output": include_io,
        }));
    }

    Ok(json!({
        "oijudge_version": env!("CARGO_PKG_VERSION"),
        "compiler_output": Value::Object(compiler_output),
        "judge_output": judged,
    }))
}

fn execution_json(run: &ExecutionResult, include_io: bool) -> Value {
    let text = |s: &str| if include_io { s.to_string() } else { String::new() };

    json!({
        "exit_code": run.exit_code,
        "time_ms": run.wall_time_ms,
        "memory_bytes": run.peak_memory_bytes,
        "stdout": text(&run.stdout),
        "stderr": text(&run.stderr),
        "output_truncated": run.output_truncated,
    })
}

pub fn write_report(path: &Path, payload: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(payload).context("Failed to serialize report JSON")?;

    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write report file {:?}", path))?;

    Ok(())
}

/* ---------------- console tables ---------------- */

/// Titled two-column table.
#[derive(Debug, Clone)]
pub struct Table {
    title: String,
    rows: Vec<(String, String)>,
}

impl Table {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.rows.push((key.to_string(), value.to_string()));
        self
    }

    pub fn render(&self, cfg: &TableConfig) -> String {
        let mut out = Vec::new();
        out.push(format!(" {}", self.title));
        out.push(format!("{}=+={}", "=".repeat(KEY_WIDTH), "=".repeat(VALUE_WIDTH)));

        for (key, value) in &self.rows {
            let left = wrap(key, KEY_WIDTH, Align::Right, cfg);
            let right = wrap(value, VALUE_WIDTH, Align::Left, cfg);
            let height = left.len().max(right.len());

            for i in 0..height {
                let l = left.get(i).cloned().unwrap_or_else(|| " ".repeat(KEY_WIDTH));
                let r = right.get(i).cloned().unwrap_or_default();
                out.push(format!("{} | {}", l, r).trim_end().to_string());
            }
        }

        let mut rendered = out.join("\n");
        rendered.push('\n');
        rendered
    }
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Right,
}

fn pad(line: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", line, width = width),
        Align::Right => format!("{:>width$}", line, width = width),
    }
}

/// Split into display lines of exactly `width` chars.
///
/// Blank lines are dropped, overly long outputs keep their head and tail
/// (`table.max_lines`), and overly long lines are cut at
/// `table.max_line_width`.
fn wrap(text: &str, width: usize, align: Align, cfg: &TableConfig) -> Vec<String> {
    let mut lines: Vec<String> = text
        .split('\n')
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    let max_lines = (cfg.max_lines / 2) * 2;
    if max_lines >= 2 && lines.len() > max_lines {
        let half = max_lines / 2;
        let total = lines.len();
        let mut kept: Vec<String> = lines[..half - 1].to_vec();
        kept.push("...".to_string());
        kept.extend_from_slice(&lines[total - (half - 1)..]);
        kept.push(format!("[{} Lines]", total));
        lines = kept;
    }

    let mut out = Vec::new();
    for line in lines {
        let chars: Vec<char> = line.chars().collect();
        let line = if chars.len() > cfg.max_line_width {
            let head: String = chars[..cfg.max_line_width].iter().collect();
            format!("{}... [{} Chars]", head, chars.len())
        } else {
            line
        };

        let chars: Vec<char> = line.chars().collect();
        for chunk in chars.chunks(width) {
            let piece: String = chunk.iter().collect();
            out.push(pad(&piece, width, align));
        }
    }

    if out.is_empty() {
        out.push(" ".repeat(width));
    }
    out
}

/// Per-case table, with input/output shown only where it helps.
pub fn result_table(result: &JudgeResult) -> Table {
    let verdict = result.verdict();
    let run = result.submission().execution.as_ref();
    let compile_output = result
        .submission()
        .compile
        .as_ref()
        .map(|c| c.diagnostic_text.as_str())
        .unwrap_or_default();

    let mut table = Table::new("Judge Results")
        .row("Judge Result", verdict.description())
        .row("Execution Time", run.map(|r| format!("{} ms", r.wall_time_ms)).unwrap_or_default())
        .row("Memory Cost", run.map(|r| format!("{} bytes", r.peak_memory_bytes)).unwrap_or_default())
        .row("Return Code", run.map(|r| r.exit_code.to_string()).unwrap_or_default())
        .row("Compile Output", compile_output);

    let stdout_of = |role: Role| {
        result
            .phase(role)
            .execution
            .as_ref()
            .map(|r| r.stdout.clone())
            .unwrap_or_default()
    };

    match verdict {
        Verdict::InvalidJudgeInput => {
            for role in [Role::Input, Role::Reference] {
                if let Some(c) = &result.phase(role).compile {
                    table = table.row(format!("{} compiler", role.name()), &c.diagnostic_text);
                }
            }
            table = table
                .row("Input", stdout_of(Role::Input))
                .row("Reference stderr", {
                    result
                        .reference()
                        .execution
                        .as_ref()
                        .map(|r| r.stderr.clone())
                        .unwrap_or_default()
                });
        }
        Verdict::CompileError | Verdict::Accepted => {}
        _ => {
            table = table
                .row("Input", stdout_of(Role::Input))
                .row("Output", stdout_of(Role::Submission))
                .row("Expected Output", stdout_of(Role::Reference));
        }
    }

    table
}

/// One row per judged case.
pub fn summary_table(results: &[JudgeResult]) -> Table {
    results
        .iter()
        .enumerate()
        .fold(Table::new("Aggregate Results"), |table, (idx, r)| {
            table.row(idx + 1, r.verdict().description())
        })
}
