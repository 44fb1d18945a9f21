// src/runner.rs

use crate::cli::{Command, RunArgs};
use crate::compiler::{Adapter, AdapterError};
use crate::config::{Config, Presentation};
use crate::engine::{Judge, JudgeContext, JudgeResult, Participant, PhaseUpdate, Role, Verdict};
use crate::process::ExecutionLimits;
use crate::report::{build_report, result_table, summary_table, write_report};
use crate::tmp::TempStore;
use crate::validate::validate_config;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One test case: where the input comes from and what it is compared to.
#[derive(Debug, Clone)]
struct Case {
    input: PathBuf,
    input_type: Option<String>,
    output: PathBuf,
    output_type: Option<String>,
}

impl Case {
    fn generator<'a>(&self) -> Participant<'a> {
        Participant::source_as(self.input.clone(), self.input_type.clone())
    }

    fn reference<'a>(&self) -> Participant<'a> {
        Participant::source_as(self.output.clone(), self.output_type.clone())
    }
}

/// Entry point from `main.rs`.
pub async fn run(config_path: &Path, command: Command) -> Result<()> {
    match command {
        Command::Init => init_scaffold(config_path),

        Command::Run(args) => {
            let mut cfg = Config::load_or_default(config_path)?;
            apply_overrides(&mut cfg, &args);

            let validation = validate_config(&cfg);
            if !validation.is_valid() {
                for e in &validation.errors {
                    eprintln!("✖ [{}] {}", e.code, e.message);
                }
                bail!("Invalid config {:?}", config_path);
            }

            let results = judge_all(&cfg, &args).await?;
            finish(&cfg, &args, &results)
        }
    }
}

/// CLI flags win over `judge.yaml`.
fn apply_overrides(cfg: &mut Config, args: &RunArgs) {
    if let Some(ms) = args.time_limit {
        cfg.limits.time_ms = ms;
    }
    if let Some(bytes) = args.memory_limit {
        cfg.limits.memory_bytes = bytes;
    }
    if args.lenient {
        cfg.presentation = Presentation::Lenient;
    } else if args.strict {
        cfg.presentation = Presentation::Strict;
    }
    if let Some(dir) = &args.tmp_dir {
        cfg.tmp_dir = Some(dir.clone());
    }
}

/* ---------------- judging ---------------- */

async fn judge_all(cfg: &Config, args: &RunArgs) -> Result<Vec<JudgeResult>> {
    // Resolve every case up front so a missing answer fails before any build.
    let cases = match &args.tests {
        Some(dir) => discover_cases(dir)?,
        None => vec![single_case(args)?],
    };

    let temps = Arc::new(TempStore::new(cfg.tmp_dir.as_deref())?);
    let ctx = JudgeContext::new(cfg, temps);
    let limits = ExecutionLimits::new(cfg.limits.time_ms, cfg.limits.memory_bytes);
    let seed = args.seed.map(|s| s.to_string());

    eprintln!("--> Compiling {}", args.code.display());

    let mut submission = Adapter::detect(&args.code, args.code_type.as_deref(), &ctx.build)
        .with_context(|| format!("Cannot judge {:?}", args.code))?;

    let mut results = Vec::with_capacity(cases.len() * args.repeat as usize);

    let compiled = submission.compile().await;

    match compiled {
        Ok(_) => {
            for (idx, case) in cases.iter().enumerate() {
                eprintln!("--> Running judge on test #{} ({})", idx + 1, case.input.display());

                let mut judge = Judge::new(
                    case.generator(),
                    Participant::Shared(&mut submission),
                    case.reference(),
                    seed.clone(),
                    &ctx,
                )
                .await?;

                for _ in 0..args.repeat {
                    let result = judge.judge(limits).await?;
                    print!("{}", result_table(&result).render(&cfg.table));
                    results.push(result);
                }

                judge.close()?;
            }

            submission.close()?;
        }

        // Every case is CE; no point starting the other participants.
        Err(AdapterError::Compile(err)) => {
            tracing::info!(error = %err, "submission failed to compile");

            let failed = JudgeResult::new(Verdict::CompileError).clone_with(
                Verdict::CompileError,
                Some(PhaseUpdate::Compile(Role::Submission, err.to_compile_result())),
            );
            print!("{}", result_table(&failed).render(&cfg.table));

            results.resize(cases.len() * args.repeat as usize, failed);
        }

        Err(other) => return Err(other.into()),
    }

    Ok(results)
}

fn single_case(args: &RunArgs) -> Result<Case> {
    let (Some(input), Some(output)) = (&args.input, &args.output) else {
        bail!("Both --input and --output are required without --tests");
    };

    Ok(Case {
        input: input.clone(),
        input_type: args.input_type.clone(),
        output: output.clone(),
        output_type: args.output_type.clone(),
    })
}

/// Every file whose name contains `.in`, paired with its `.ans` (or
/// `.out`) sibling, in sorted path order.
fn discover_cases(dir: &Path) -> Result<Vec<Case>> {
    let mut inputs = Vec::new();

    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", dir))?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().contains(".in") {
            inputs.push(entry.path().to_path_buf());
        }
    }

    if inputs.is_empty() {
        bail!("No test inputs (*.in) found under {:?}", dir);
    }

    inputs.sort();

    inputs
        .into_iter()
        .map(|input| {
            let output = answer_for(&input)
                .with_context(|| format!("No expected output (.ans / .out) for {:?}", input))?;

            Ok(Case {
                input,
                input_type: Some("text".to_string()),
                output,
                output_type: Some("text".to_string()),
            })
        })
        .collect()
}

fn answer_for(input: &Path) -> Option<PathBuf> {
    let name = input.file_name()?.to_string_lossy().into_owned();

    [".ans", ".out"]
        .iter()
        .map(|ext| input.with_file_name(name.replacen(".in", ext, 1)))
        .find(|candidate| candidate.is_file())
}

/* ---------------- reporting ---------------- */

fn finish(cfg: &Config, args: &RunArgs, results: &[JudgeResult]) -> Result<()> {
    eprintln!("--> All tests done.");
    print!("{}", summary_table(results).render(&cfg.table));

    let payload = build_report(results, !args.json_no_io)?;
    write_report(&args.json, &payload)?;
    eprintln!("Wrote {}", args.json.display());

    let rejected = results.iter().filter(|r| !r.verdict().is_accepted()).count();
    if rejected > 0 {
        bail!("{} of {} judgements were not accepted", rejected, results.len());
    }

    Ok(())
}

/* ---------------- init ---------------- */

fn init_scaffold(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        eprintln!("{} already exists (skipping)", config_path.display());
        return Ok(());
    }

    std::fs::write(config_path, default_config_yaml())
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    eprintln!("Created {}", config_path.display());

    Ok(())
}

fn default_config_yaml() -> &'static str {
    r#"# oijudge configuration

# Where compiled submissions go. Unset = a fresh temp dir per run.
tmp_dir: ~

# stdout / stderr at or above this many bytes is OLE.
max_output: 67108864

# strict: formatting-only differences are PE. lenient: they are AC.
presentation: strict

sample_interval_ms: 15

limits:
  time_ms: 1000
  memory_bytes: 536870912

table:
  max_lines: 20
  max_line_width: 256

# {source_file} and {output_file} are substituted before invocation.
toolchains:
  c: [gcc, -O2, -o, "{output_file}", "{source_file}"]
  c++: [g++, -O2, -o, "{output_file}", "{source_file}"]
  pascal: [fpc, "{source_file}", "-o{output_file}"]
  python2: [python2, "{source_file}"]
  python3: [python3, "{source_file}"]
"#
}
