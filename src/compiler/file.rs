// src/compiler/file.rs

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{file_output, CompileResult, CompilerError, ContractViolation};
use crate::process::ExecutionResult;

/// A plain file presented as a program whose stdout is the file content.
///
/// "Compiling" opens the file; every execution rewinds and reads it in
/// full, so it can be replayed any number of times.
#[derive(Debug)]
pub struct FileEcho {
    path: PathBuf,
    handle: Option<File>,
}

impl FileEcho {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            handle: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn compile(&mut self) -> Result<CompileResult, CompilerError> {
        let handle = File::open(&self.path)
            .await
            .map_err(|source| CompilerError::Unreadable {
                path: self.path.clone(),
                source,
            })?;

        self.handle = Some(handle);
        Ok(CompileResult::success())
    }

    pub async fn execute(&mut self) -> Result<ExecutionResult, ContractViolation> {
        let handle = self.handle.as_mut().ok_or(ContractViolation::NotCompiled)?;

        let read = async {
            handle.seek(SeekFrom::Start(0)).await?;
            let mut bytes = Vec::new();
            handle.read_to_end(&mut bytes).await?;
            Ok::<_, std::io::Error>(bytes)
        }
        .await;

        Ok(file_output(read, &self.path))
    }

    pub fn close(&mut self) {
        self.handle = None;
    }
}
