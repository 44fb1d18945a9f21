// src/validate.rs

use serde::Serialize;

use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Serialize)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn push_error(&mut self, code: &'static str, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            code,
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.valid && self.errors.is_empty()
    }
}

pub fn validate_config(cfg: &Config) -> ValidationResult {
    let mut result = ValidationResult::ok();

    validate_output(cfg, &mut result);
    validate_sampling(cfg, &mut result);
    validate_toolchains(cfg, &mut result);
    validate_table(cfg, &mut result);

    result
}

/* ---------------- output ceiling ---------------- */

fn validate_output(cfg: &Config, result: &mut ValidationResult) {
    if cfg.max_output == 0 {
        result.push_error("MAX_OUTPUT_ZERO", "max_output must be greater than zero");
    }
}

/* ---------------- watchdog ---------------- */

fn validate_sampling(cfg: &Config, result: &mut ValidationResult) {
    if cfg.sample_interval_ms == 0 {
        result.push_error(
            "SAMPLE_INTERVAL_ZERO",
            "sample_interval_ms must be greater than zero",
        );
    }
}

/* ---------------- toolchains ---------------- */

fn validate_toolchains(cfg: &Config, result: &mut ValidationResult) {
    for (tag, template) in &cfg.toolchains {
        if template.first().map_or(true, |program| program.trim().is_empty()) {
            result.push_error(
                "TOOLCHAIN_EMPTY",
                format!("Toolchain '{}' has no program", tag),
            );
            continue;
        }

        if !template.iter().any(|arg| arg.contains("{source_file}")) {
            result.push_error(
                "TOOLCHAIN_NO_SOURCE",
                format!("Toolchain '{}' never references {{source_file}}", tag),
            );
        }
    }
}

/* ---------------- table ---------------- */

fn validate_table(cfg: &Config, result: &mut ValidationResult) {
    if cfg.table.max_line_width < 8 {
        result.push_error(
            "TABLE_TOO_NARROW",
            "table.max_line_width must be at least 8",
        );
    }
}
