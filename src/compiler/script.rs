// src/compiler/script.rs

use std::path::{Path, PathBuf};

use super::{ensure_readable, substitute, CompileResult, CompilerError};
use crate::process::{ExecutionLimits, ExecutionResult, ProcessExecutor};

/// Source run through an interpreter on every execution.
///
/// Nothing is built ahead of time; "compiling" only checks the script can
/// be opened. The interpreter command line comes from the `judge.yaml`
/// template with `{source_file}` filled in.
#[derive(Debug)]
pub struct InterpretedScript {
    source: PathBuf,
    template: Vec<String>,
    executor: ProcessExecutor,
}

impl InterpretedScript {
    pub fn new(source: &Path, template: Vec<String>, executor: ProcessExecutor) -> Self {
        Self {
            source: source.to_path_buf(),
            template,
            executor,
        }
    }

    pub fn compile(&mut self) -> Result<CompileResult, CompilerError> {
        ensure_readable(&self.source)?;
        Ok(CompileResult::success())
    }

    pub async fn execute(
        &self,
        extra_args: &[String],
        stdin: &[u8],
        limits: ExecutionLimits,
    ) -> ExecutionResult {
        let mut args = substitute(&self.template, &self.source, None);
        args.extend_from_slice(extra_args);
        self.executor.run(&args, stdin, limits).await
    }
}
