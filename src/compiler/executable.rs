// src/compiler/executable.rs

use std::path::{Path, PathBuf};

use super::{CompileResult, CompilerError};
use crate::process::{ExecutionLimits, ExecutionResult, ProcessExecutor};

/// An already-built program, run as-is.
///
/// Running untrusted binaries this way gets no more isolation than any
/// other adapter; take care on shared machines.
#[derive(Debug)]
pub struct RawExecutable {
    program: PathBuf,
    executor: ProcessExecutor,
}

impl RawExecutable {
    pub fn new(path: &Path, executor: ProcessExecutor) -> Self {
        Self {
            program: runnable_path(path),
            executor,
        }
    }

    pub fn compile(&mut self) -> Result<CompileResult, CompilerError> {
        if let Err(source) = std::fs::metadata(&self.program) {
            return Err(CompilerError::Unreadable {
                path: self.program.clone(),
                source,
            });
        }
        Ok(CompileResult::success())
    }

    pub async fn execute(
        &self,
        extra_args: &[String],
        stdin: &[u8],
        limits: ExecutionLimits,
    ) -> ExecutionResult {
        let mut args = vec![self.program.to_string_lossy().to_string()];
        args.extend_from_slice(extra_args);
        self.executor.run(&args, stdin, limits).await
    }
}

/// A bare file name would be looked up on `PATH`; anchor it to the
/// current directory instead.
fn runnable_path(path: &Path) -> PathBuf {
    if path.is_relative() && path.components().count() == 1 {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}
