// src/compiler/native.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ensure_readable, substitute, CompileResult, CompilerError, ContractViolation};
use crate::process::{ExecutionLimits, ExecutionResult, ProcessExecutor};
use crate::tmp::TempStore;

/// Source built by an external compiler into a temporary executable.
///
/// The compiler itself runs without time or memory limits. Its stderr is
/// the diagnostic text. On success the adapter owns the artifact until it
/// is closed (or dropped).
#[derive(Debug)]
pub struct CompiledNative {
    source: PathBuf,
    template: Vec<String>,
    executor: ProcessExecutor,
    temps: Arc<TempStore>,
    artifact: Option<PathBuf>,
}

impl CompiledNative {
    pub fn new(
        source: &Path,
        template: Vec<String>,
        executor: ProcessExecutor,
        temps: Arc<TempStore>,
    ) -> Self {
        Self {
            source: source.to_path_buf(),
            template,
            executor,
            temps,
            artifact: None,
        }
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    pub async fn compile(&mut self) -> Result<CompileResult, CompilerError> {
        ensure_readable(&self.source)?;

        let output = self.temps.allocate().map_err(CompilerError::Artifact)?;
        let args = substitute(&self.template, &self.source, Some(&output));

        tracing::info!(source = %self.source.display(), toolchain = ?args.first(), "invoking compiler");

        let run = self
            .executor
            .run(&args, b"", ExecutionLimits::UNLIMITED)
            .await;

        adopt_exe_suffix(&output);

        if !run.succeeded() {
            self.temps.release(&output);

            let diagnostics = if run.stderr.is_empty() && run.stdout.is_empty() {
                format!(
                    "failed to run toolchain `{}`",
                    args.first().map(String::as_str).unwrap_or_default()
                )
            } else if run.stderr.is_empty() {
                run.stdout
            } else {
                run.stderr
            };

            return Err(CompilerError::Failed {
                exit_code: run.exit_code,
                diagnostics,
            });
        }

        self.artifact = Some(output);
        Ok(CompileResult {
            exit_code: run.exit_code,
            diagnostic_text: run.stderr,
        })
    }

    pub async fn execute(
        &self,
        extra_args: &[String],
        stdin: &[u8],
        limits: ExecutionLimits,
    ) -> Result<ExecutionResult, ContractViolation> {
        let artifact = self.artifact.as_ref().ok_or(ContractViolation::NotCompiled)?;

        let mut args = vec![artifact.to_string_lossy().to_string()];
        args.extend_from_slice(extra_args);
        Ok(self.executor.run(&args, stdin, limits).await)
    }

    pub fn close(&mut self) {
        if let Some(artifact) = self.artifact.take() {
            self.temps.release(&artifact);
        }
    }
}

impl Drop for CompiledNative {
    fn drop(&mut self) {
        self.close();
    }
}

/// Toolchains on Windows append `.exe` to the requested output name.
fn adopt_exe_suffix(output: &Path) {
    let mut with_exe = output.as_os_str().to_owned();
    with_exe.push(".exe");
    let with_exe = PathBuf::from(with_exe);

    if with_exe.exists() && !output.exists() {
        if let Err(e) = std::fs::rename(&with_exe, output) {
            tracing::warn!(path = %with_exe.display(), error = %e, "failed to rename compiled artifact");
        }
    }
}
