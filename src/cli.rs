// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A simple judge for OI / ACM style problems.
///
/// `judge.yaml` is the primary source of truth.
/// CLI flags only override config values.
#[derive(Parser, Debug)]
#[command(name = "oijudge", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Path to config file
    #[arg(long, global = true, default_value = "judge.yaml")]
    pub config: PathBuf,

    /// Debug-level logging on stderr (RUST_LOG wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// All supported CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Judge a submission.
    ///
    /// Either a single case (`--input` + `--output`, each a file or a
    /// program) or a folder of `.in` / `.ans` pairs (`--tests`).
    Run(RunArgs),

    /// Write a default judge.yaml into the current directory.
    Init,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Submission source
    #[arg(short, long)]
    pub code: PathBuf,

    /// Force the submission type (c, c++, pascal, python3, exe...)
    #[arg(long)]
    pub code_type: Option<String>,

    /// Input file, `*` sequence pattern or generator program
    #[arg(short, long, required_unless_present = "tests", conflicts_with = "tests")]
    pub input: Option<PathBuf>,

    #[arg(long)]
    pub input_type: Option<String>,

    /// Expected output file or reference program
    #[arg(short, long, required_unless_present = "tests", conflicts_with = "tests")]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub output_type: Option<String>,

    /// Folder of test cases (`name.in` with `name.ans` or `name.out`)
    #[arg(long, visible_alias = "io")]
    pub tests: Option<PathBuf>,

    /// Time limit in milliseconds (0 = unlimited)
    #[arg(short = 't', long)]
    pub time_limit: Option<u64>,

    /// Memory limit in bytes (0 = unlimited)
    #[arg(short = 'm', long)]
    pub memory_limit: Option<u64>,

    /// Seed passed to the generator as its only argument
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Judge every case N times
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Where to write the JSON report
    #[arg(short, long, default_value = "results.json")]
    pub json: PathBuf,

    /// Leave stdout / stderr out of the JSON report
    #[arg(long)]
    pub json_no_io: bool,

    /// Fold presentation errors into AC
    #[arg(long, conflicts_with = "strict")]
    pub lenient: bool,

    /// Report formatting-only differences as PE
    #[arg(long)]
    pub strict: bool,

    /// Directory for compiled artifacts
    #[arg(long)]
    pub tmp_dir: Option<PathBuf>,
}
