// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};

/// Root configuration loaded from `judge.yaml`.
///
/// This file controls:
/// - Which compiler / interpreter command lines are used per language
/// - The output ceiling used for OLE classification
/// - Whether formatting-only differences are reported as PE
/// - Default time and memory limits
///
/// The value is built once at startup and handed to every component by
/// reference. Nothing reads configuration from ambient state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory for compiled artifacts.
    ///
    /// When unset, a managed temporary directory is created and removed
    /// once judging is over.
    #[serde(default)]
    pub tmp_dir: Option<PathBuf>,

    /// Maximum byte length of stdout / stderr before OLE.
    #[serde(default = "default_max_output")]
    pub max_output: u64,

    /// Exact-byte comparison toggle.
    #[serde(default)]
    pub presentation: Presentation,

    /// Watchdog sampling cadence in milliseconds.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Default limits (CLI flags override these)
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Console table shaping
    #[serde(default)]
    pub table: TableConfig,

    /// Language tag -> argument template.
    ///
    /// Placeholders `{source_file}` and `{output_file}` are substituted
    /// before invocation.
    ///
    /// Example:
    ///
    /// toolchains:
    ///   c++: [g++, -O2, -o, "{output_file}", "{source_file}"]
    ///   python3: [python3, "{source_file}"]
    #[serde(default = "default_toolchains")]
    pub toolchains: BTreeMap<String, Vec<String>>,
}

/// How a correct-but-differently-formatted answer is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Presentation {
    /// Byte differences after a token match are PE.
    #[default]
    Strict,
    /// Token match is enough for AC.
    Lenient,
}

impl Presentation {
    pub fn is_strict(self) -> bool {
        matches!(self, Presentation::Strict)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default = "default_time_ms")]
    pub time_ms: u64,

    #[serde(default = "default_memory_bytes")]
    pub memory_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            time_ms: default_time_ms(),
            memory_bytes: default_memory_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TableConfig {
    #[serde(default = "default_table_max_lines")]
    pub max_lines: usize,

    #[serde(default = "default_table_max_line_width")]
    pub max_line_width: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_lines: default_table_max_lines(),
            max_line_width: default_table_max_line_width(),
        }
    }
}

fn default_max_output() -> u64 {
    64 * 1024 * 1024
}

fn default_sample_interval_ms() -> u64 {
    15
}

fn default_time_ms() -> u64 {
    1000
}

fn default_memory_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_table_max_lines() -> usize {
    20
}

fn default_table_max_line_width() -> usize {
    256
}

fn template(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn default_toolchains() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    map.insert(
        "c".to_string(),
        template(&["gcc", "-O2", "-o", "{output_file}", "{source_file}"]),
    );
    map.insert(
        "c++".to_string(),
        template(&["g++", "-O2", "-o", "{output_file}", "{source_file}"]),
    );
    map.insert(
        "pascal".to_string(),
        template(&["fpc", "{source_file}", "-o{output_file}"]),
    );
    map.insert("python2".to_string(), template(&["python2", "{source_file}"]));
    map.insert("python3".to_string(), template(&["python3", "{source_file}"]));
    map
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmp_dir: None,
            max_output: default_max_output(),
            presentation: Presentation::default(),
            sample_interval_ms: default_sample_interval_ms(),
            limits: LimitsConfig::default(),
            table: TableConfig::default(),
            toolchains: default_toolchains(),
        }
    }
}

impl Config {
    /// Load and parse `judge.yaml` from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_yaml(&raw)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(raw).context("Failed to parse YAML config")?;
        Ok(cfg)
    }
}
