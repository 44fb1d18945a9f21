// src/compiler/sequence.rs

use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use super::{CompileResult, CompilerError, ContractViolation, FileEcho};
use crate::process::ExecutionResult;

/// Upper bound on files picked up by one sequence pattern.
pub const MAX_SEQUENCE_MEMBERS: usize = 100;

/// A numbered family of files replayed one per execution.
///
/// The pattern's file name holds a single `*` standing for the index:
/// `tests/case*.in` picks up `case1.in`, `case.2.in`, `case (3).in`,
/// `CASE_04.IN`, ... in ascending index order. After the last file the
/// sequence wraps back to the first.
#[derive(Debug)]
pub struct DirectorySequence {
    pattern: PathBuf,
    members: Vec<FileEcho>,
    cursor: usize,
}

impl DirectorySequence {
    pub fn new(pattern: &Path) -> Self {
        Self {
            pattern: pattern.to_path_buf(),
            members: Vec::new(),
            cursor: 0,
        }
    }

    /// Paths of the discovered files, in replay order.
    pub fn members(&self) -> Vec<&Path> {
        self.members.iter().map(FileEcho::path).collect()
    }

    pub async fn compile(&mut self) -> Result<CompileResult, CompilerError> {
        let dir = sequence_dir(&self.pattern);
        let paths = discover_sequence(&self.pattern).map_err(|source| CompilerError::Unreadable {
            path: dir.to_path_buf(),
            source,
        })?;

        if paths.is_empty() {
            return Err(CompilerError::EmptySequence(self.pattern.clone()));
        }

        let mut members = Vec::with_capacity(paths.len());
        for path in paths {
            let mut echo = FileEcho::new(&path);
            echo.compile().await?;
            members.push(echo);
        }

        tracing::debug!(
            pattern = %self.pattern.display(),
            count = members.len(),
            "sequence discovered"
        );

        self.members = members;
        self.cursor = 0;
        Ok(CompileResult::success())
    }

    pub async fn execute(&mut self) -> Result<ExecutionResult, ContractViolation> {
        if self.members.is_empty() {
            return Err(ContractViolation::NotCompiled);
        }

        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.members.len();
        self.members[index].execute().await
    }

    pub fn close(&mut self) {
        for member in &mut self.members {
            member.close();
        }
        self.members.clear();
        self.cursor = 0;
    }
}

fn sequence_dir(pattern: &Path) -> &Path {
    pattern
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Files next to `pattern` that match its numbered-name convention.
///
/// Sorted by numeric index (then name), capped at
/// [`MAX_SEQUENCE_MEMBERS`]. A pattern without `*` matches nothing.
pub fn discover_sequence(pattern: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = sequence_dir(pattern);

    let Some(name) = pattern.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let Some((prefix, suffix)) = name.split_once('*') else {
        return Ok(Vec::new());
    };

    let prefix = prefix.trim_end_matches(['.', '_', '-', ' ']);
    let matcher = Regex::new(&format!(
        r"(?i)^{}[ ._-]*\(?(\d+)\)?{}$",
        regex::escape(prefix),
        regex::escape(suffix)
    ))
    .map_err(io::Error::other)?;

    let mut found: Vec<(u64, String, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };

        let index = matcher
            .captures(file_name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok());

        if let Some(index) = index {
            found.push((index, file_name.to_string(), entry.path()));
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    found.truncate(MAX_SEQUENCE_MEMBERS);

    Ok(found.into_iter().map(|(_, _, path)| path).collect())
}
