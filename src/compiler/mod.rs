// src/compiler/mod.rs

//! Turning a source artifact into something runnable.
//!
//! Every participant of a judging session (input generator, reference
//! solution, submission) is an [`Adapter`]: a plain text file, a numbered
//! set of files, a script, a native source file, or a ready executable.
//! All of them share one lifecycle:
//!
//! ```text
//! Uninitialized --compile()--> Compiled --close()--> Closed
//!                               |    ^
//!                               +----+ execute() / compile() (cached)
//! ```
//!
//! `compile()` is idempotent: once it succeeded, further calls return the
//! cached [`CompileResult`] and never invoke the toolchain again. Calling
//! `execute()` or `close()` out of sequence is a [`ContractViolation`].

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::process::{ExecutionLimits, ExecutionResult, ProcessExecutor};
use crate::tmp::TempStore;
use crate::util::decode_text;

mod detect;
mod executable;
mod file;
mod native;
mod script;
mod sequence;

pub use detect::{detect, resolve_kind, SourceKind};
pub use executable::RawExecutable;
pub use file::FileEcho;
pub use native::CompiledNative;
pub use script::InterpretedScript;
pub use sequence::{discover_sequence, DirectorySequence, MAX_SEQUENCE_MEMBERS};

/// Output of the compile step, produced once per adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    pub exit_code: i32,
    pub diagnostic_text: String,
}

impl CompileResult {
    /// Successful "compile" that produced no diagnostics.
    pub fn success() -> Self {
        Self {
            exit_code: 0,
            diagnostic_text: String::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Setup failures: the artifact cannot be turned into something runnable.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("unable to open {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no toolchain configured for language '{0}'")]
    MissingToolchain(String),

    #[error("unknown source type '{0}'")]
    UnknownSourceType(String),

    #[error("compilation failed with exit code {exit_code}")]
    Failed { exit_code: i32, diagnostics: String },

    #[error("no files match sequence pattern {0:?}")]
    EmptySequence(PathBuf),

    #[error("failed to allocate artifact path: {0}")]
    Artifact(#[source] io::Error),
}

impl CompilerError {
    /// Diagnostic record kept for display when compilation fails.
    pub fn to_compile_result(&self) -> CompileResult {
        match self {
            CompilerError::Failed {
                exit_code,
                diagnostics,
            } => CompileResult {
                exit_code: *exit_code,
                diagnostic_text: diagnostics.clone(),
            },
            other => CompileResult {
                exit_code: 1,
                diagnostic_text: other.to_string(),
            },
        }
    }
}

/// Programmer errors: operations called out of lifecycle order.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("adapter has not been compiled")]
    NotCompiled,

    #[error("adapter is already closed")]
    AlreadyClosed,

    #[error("judging engine is already closed")]
    EngineClosed,
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Compile(#[from] CompilerError),

    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

/// Everything adapters need from configuration, built once and shared.
#[derive(Debug, Clone)]
pub struct BuildContext {
    toolchains: Arc<BTreeMap<String, Vec<String>>>,
    executor: ProcessExecutor,
    temps: Arc<TempStore>,
}

impl BuildContext {
    pub fn new(cfg: &Config, temps: Arc<TempStore>) -> Self {
        Self {
            toolchains: Arc::new(cfg.toolchains.clone()),
            executor: ProcessExecutor::from_config(cfg),
            temps,
        }
    }

    pub fn executor(&self) -> &ProcessExecutor {
        &self.executor
    }

    pub fn temps(&self) -> &Arc<TempStore> {
        &self.temps
    }

    fn toolchain(&self, tag: &str) -> Result<Vec<String>, CompilerError> {
        self.toolchains
            .get(tag)
            .cloned()
            .ok_or_else(|| CompilerError::MissingToolchain(tag.to_string()))
    }
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Compiled(CompileResult),
    Closed,
}

#[derive(Debug)]
enum Backend {
    File(FileEcho),
    Sequence(DirectorySequence),
    Script(InterpretedScript),
    Native(CompiledNative),
    Executable(RawExecutable),
}

/// A compile / execute / close handle over one runnable artifact.
#[derive(Debug)]
pub struct Adapter {
    source: PathBuf,
    kind: SourceKind,
    state: Lifecycle,
    backend: Backend,
}

impl Adapter {
    /// Pick the variant from the path (or an explicit type override) and
    /// build it.
    pub fn detect(
        path: impl AsRef<Path>,
        type_override: Option<&str>,
        ctx: &BuildContext,
    ) -> Result<Self, CompilerError> {
        let path = path.as_ref();
        let kind = resolve_kind(path, type_override)?;
        Self::for_kind(path, kind, ctx)
    }

    /// Build the adapter for a known kind. Fails when the kind needs a
    /// toolchain that is not configured.
    pub fn for_kind(
        path: impl AsRef<Path>,
        kind: SourceKind,
        ctx: &BuildContext,
    ) -> Result<Self, CompilerError> {
        let path = path.as_ref();

        let backend = match kind {
            SourceKind::Text => Backend::File(FileEcho::new(path)),
            SourceKind::Sequence => Backend::Sequence(DirectorySequence::new(path)),
            SourceKind::Executable => {
                Backend::Executable(RawExecutable::new(path, ctx.executor.clone()))
            }
            SourceKind::C | SourceKind::Cpp | SourceKind::Pascal => {
                let template = ctx.toolchain(kind.language_tag())?;
                Backend::Native(CompiledNative::new(
                    path,
                    template,
                    ctx.executor.clone(),
                    Arc::clone(&ctx.temps),
                ))
            }
            SourceKind::Python2 | SourceKind::Python3 => {
                let template = ctx.toolchain(kind.language_tag())?;
                Backend::Script(InterpretedScript::new(path, template, ctx.executor.clone()))
            }
        };

        Ok(Self::with_backend(path, kind, backend))
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::with_backend(path, SourceKind::Text, Backend::File(FileEcho::new(path)))
    }

    pub fn sequence(pattern: impl AsRef<Path>) -> Self {
        let pattern = pattern.as_ref();
        Self::with_backend(
            pattern,
            SourceKind::Sequence,
            Backend::Sequence(DirectorySequence::new(pattern)),
        )
    }

    /// Script run by an interpreter `template` (e.g. `["python3", "{source_file}"]`).
    pub fn script(
        path: impl AsRef<Path>,
        kind: SourceKind,
        template: Vec<String>,
        executor: ProcessExecutor,
    ) -> Self {
        let path = path.as_ref();
        Self::with_backend(
            path,
            kind,
            Backend::Script(InterpretedScript::new(path, template, executor)),
        )
    }

    /// Source built by a compiler `template` into an artifact from `temps`.
    pub fn native(
        path: impl AsRef<Path>,
        kind: SourceKind,
        template: Vec<String>,
        executor: ProcessExecutor,
        temps: Arc<TempStore>,
    ) -> Self {
        let path = path.as_ref();
        Self::with_backend(
            path,
            kind,
            Backend::Native(CompiledNative::new(path, template, executor, temps)),
        )
    }

    pub fn executable(path: impl AsRef<Path>, executor: ProcessExecutor) -> Self {
        let path = path.as_ref();
        Self::with_backend(
            path,
            SourceKind::Executable,
            Backend::Executable(RawExecutable::new(path, executor)),
        )
    }

    fn with_backend(path: &Path, kind: SourceKind, backend: Backend) -> Self {
        Self {
            source: path.to_path_buf(),
            kind,
            state: Lifecycle::Uninitialized,
            backend,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state, Lifecycle::Compiled(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, Lifecycle::Closed)
    }

    /// Compile once. Later calls return the cached result.
    ///
    /// A failed compile leaves the adapter uninitialized.
    pub async fn compile(&mut self) -> Result<CompileResult, AdapterError> {
        match &self.state {
            Lifecycle::Compiled(cached) => return Ok(cached.clone()),
            Lifecycle::Closed => return Err(ContractViolation::AlreadyClosed.into()),
            Lifecycle::Uninitialized => {}
        }

        tracing::debug!(source = %self.source.display(), kind = ?self.kind, "compiling");

        let mut result = match &mut self.backend {
            Backend::File(b) => b.compile().await,
            Backend::Sequence(b) => b.compile().await,
            Backend::Script(b) => b.compile(),
            Backend::Native(b) => b.compile().await,
            Backend::Executable(b) => b.compile(),
        }?;

        result.diagnostic_text = result.diagnostic_text.replace('\r', "");
        self.state = Lifecycle::Compiled(result.clone());
        Ok(result)
    }

    /// Run the compiled artifact once.
    pub async fn execute(
        &mut self,
        extra_args: &[String],
        stdin: &[u8],
        limits: ExecutionLimits,
    ) -> Result<ExecutionResult, ContractViolation> {
        match self.state {
            Lifecycle::Compiled(_) => {}
            Lifecycle::Uninitialized => return Err(ContractViolation::NotCompiled),
            Lifecycle::Closed => return Err(ContractViolation::AlreadyClosed),
        }

        let result = match &mut self.backend {
            Backend::File(b) => b.execute().await?,
            Backend::Sequence(b) => b.execute().await?,
            Backend::Script(b) => b.execute(extra_args, stdin, limits).await,
            Backend::Native(b) => b.execute(extra_args, stdin, limits).await?,
            Backend::Executable(b) => b.execute(extra_args, stdin, limits).await,
        };

        Ok(result)
    }

    /// Release owned resources (file handles, compiled artifacts).
    pub fn close(&mut self) -> Result<(), ContractViolation> {
        match self.state {
            Lifecycle::Compiled(_) => {}
            Lifecycle::Uninitialized => return Err(ContractViolation::NotCompiled),
            Lifecycle::Closed => return Err(ContractViolation::AlreadyClosed),
        }

        match &mut self.backend {
            Backend::File(b) => b.close(),
            Backend::Sequence(b) => b.close(),
            Backend::Script(_) | Backend::Executable(_) => {}
            Backend::Native(b) => b.close(),
        }

        tracing::debug!(source = %self.source.display(), "closed");
        self.state = Lifecycle::Closed;
        Ok(())
    }
}

/// Fill `{source_file}` / `{output_file}` into an argument template.
pub(crate) fn substitute(template: &[String], source: &Path, output: Option<&Path>) -> Vec<String> {
    let source = source.to_string_lossy();
    let output = output.map(|p| p.to_string_lossy());

    template
        .iter()
        .map(|arg| {
            let arg = arg.replace("{source_file}", &source);
            match &output {
                Some(out) => arg.replace("{output_file}", out),
                None => arg,
            }
        })
        .collect()
}

/// Open a file for reading, mapping failure to a setup error.
pub(crate) fn ensure_readable(path: &Path) -> Result<(), CompilerError> {
    std::fs::File::open(path)
        .map(|_| ())
        .map_err(|source| CompilerError::Unreadable {
            path: path.to_path_buf(),
            source,
        })
}

/// Text of a file-backed "run", or a failed result when reading fails.
pub(crate) fn file_output(read: io::Result<Vec<u8>>, path: &Path) -> ExecutionResult {
    match read {
        Ok(bytes) => ExecutionResult::from_stdout(decode_text(&bytes)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read file");
            let mut failed = ExecutionResult::spawn_failure();
            failed.stderr = e.to_string();
            failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn substitution_fills_both_placeholders() {
        let args = substitute(
            &strings(&["g++", "-o", "{output_file}", "{source_file}", "-o{output_file}"]),
            Path::new("a.cpp"),
            Some(Path::new("/tmp/x")),
        );
        assert_eq!(args, strings(&["g++", "-o", "/tmp/x", "a.cpp", "-o/tmp/x"]));
    }

    #[test]
    fn substitution_without_output_leaves_placeholder() {
        let args = substitute(&strings(&["python3", "{source_file}"]), Path::new("s.py"), None);
        assert_eq!(args, strings(&["python3", "s.py"]));
    }

    #[test]
    fn compiler_failure_keeps_diagnostics() {
        let err = CompilerError::Failed {
            exit_code: 2,
            diagnostics: "a.c:1: error".to_string(),
        };
        let result = err.to_compile_result();
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.diagnostic_text, "a.c:1: error");

        let err = CompilerError::MissingToolchain("java".to_string());
        let result = err.to_compile_result();
        assert_eq!(result.exit_code, 1);
        assert!(result.diagnostic_text.contains("java"));
    }

    #[test]
    fn missing_toolchain_is_reported_at_construction() {
        let mut cfg = Config::default();
        cfg.toolchains.remove("c++");
        let temps = Arc::new(TempStore::managed().unwrap());
        let ctx = BuildContext::new(&cfg, temps);

        let err = Adapter::detect("sol.cpp", None, &ctx).unwrap_err();
        assert!(matches!(err, CompilerError::MissingToolchain(tag) if tag == "c++"));
    }

    #[tokio::test]
    async fn lifecycle_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "1 2\n").unwrap();

        let mut adapter = Adapter::file(&path);
        let err = adapter
            .execute(&[], b"", ExecutionLimits::UNLIMITED)
            .await
            .unwrap_err();
        assert_eq!(err, ContractViolation::NotCompiled);
        assert_eq!(adapter.close(), Err(ContractViolation::NotCompiled));

        adapter.compile().await.unwrap();
        assert!(adapter.is_compiled());
        adapter.close().unwrap();
        assert!(adapter.is_closed());

        assert_eq!(adapter.close(), Err(ContractViolation::AlreadyClosed));
        let err = adapter.compile().await.unwrap_err();
        assert!(matches!(err, AdapterError::Contract(ContractViolation::AlreadyClosed)));
    }

    #[tokio::test]
    async fn unreadable_source_is_a_compiler_error() {
        let mut adapter = Adapter::file("/no/such/dir/input.txt");
        let err = adapter.compile().await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Compile(CompilerError::Unreadable { .. })
        ));
        assert!(!adapter.is_compiled());
    }
}
