// src/engine/judge.rs

//! The judging state machine.
//!
//! ```text
//! Initialized -> Compiled -> (judge)* -> Closed
//!            \-> CompileFailed -> (judge returns the failure)* -> Closed
//! ```
//!
//! Compile order is generator, reference, submission. A generator or
//! reference that fails to build makes every judgement IJI; a submission
//! that fails to build makes it CE. Each judgement then runs the
//! generator, feeds its output to the reference and the submission, and
//! classifies the submission run. A generator or reference run that exits
//! non-zero or hits the output ceiling is IJI as well.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::compiler::{Adapter, AdapterError, BuildContext, CompilerError, ContractViolation};
use crate::config::Config;
use crate::engine::{Classifier, JudgeResult, PhaseUpdate, Role, Verdict};
use crate::process::{ExecutionLimits, ExecutionResult};
use crate::tmp::TempStore;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// A participant could not even be set up (unknown type, missing
    /// toolchain mapping).
    #[error("{role} setup failed: {source}")]
    Setup {
        role: &'static str,
        #[source]
        source: CompilerError,
    },

    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

/// Shared, read-only settings for any number of judging sessions.
#[derive(Debug, Clone)]
pub struct JudgeContext {
    pub build: BuildContext,
    pub classifier: Classifier,
}

impl JudgeContext {
    pub fn new(cfg: &Config, temps: Arc<TempStore>) -> Self {
        Self {
            build: BuildContext::new(cfg, temps),
            classifier: Classifier::from_config(cfg),
        }
    }
}

/// How a participant is handed to the engine.
#[derive(Debug)]
pub enum Participant<'a> {
    /// A path to auto-detect (with optional type override). Engine-owned.
    Source {
        path: PathBuf,
        type_override: Option<String>,
    },
    /// A ready adapter given away to the engine. Engine-owned.
    Owned(Adapter),
    /// A caller-owned adapter, typically compiled once and shared across
    /// many sessions. The engine never closes it.
    Shared(&'a mut Adapter),
}

impl Participant<'_> {
    pub fn source(path: impl Into<PathBuf>) -> Self {
        Participant::Source {
            path: path.into(),
            type_override: None,
        }
    }

    pub fn source_as(path: impl Into<PathBuf>, type_override: Option<String>) -> Self {
        Participant::Source {
            path: path.into(),
            type_override,
        }
    }
}

#[derive(Debug)]
enum Slot<'a> {
    Owned(Adapter),
    Borrowed(&'a mut Adapter),
}

impl<'a> Slot<'a> {
    fn build(participant: Participant<'a>, role: Role, ctx: &BuildContext) -> Result<Self, JudgeError> {
        match participant {
            Participant::Source {
                path,
                type_override,
            } => Adapter::detect(&path, type_override.as_deref(), ctx)
                .map(Slot::Owned)
                .map_err(|source| JudgeError::Setup {
                    role: role.name(),
                    source,
                }),
            Participant::Owned(adapter) => Ok(Slot::Owned(adapter)),
            Participant::Shared(adapter) => Ok(Slot::Borrowed(adapter)),
        }
    }

    fn adapter(&mut self) -> &mut Adapter {
        match self {
            Slot::Owned(adapter) => adapter,
            Slot::Borrowed(adapter) => adapter,
        }
    }

    fn owned(&self) -> bool {
        matches!(self, Slot::Owned(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Initialized,
    Compiled,
    CompileFailed,
    Closed,
}

/// One judging session: generator, reference and submission.
#[derive(Debug)]
pub struct Judge<'a> {
    generator: Slot<'a>,
    reference: Slot<'a>,
    submission: Slot<'a>,
    seed: Option<String>,
    classifier: Classifier,
    state: EngineState,
    base: JudgeResult,
}

impl<'a> Judge<'a> {
    /// Build and compile all three participants.
    ///
    /// Compile failures do not fail construction: they are kept and
    /// reported by every [`Judge::judge`] call (IJI or CE). Only setup
    /// errors and contract violations are returned here.
    pub async fn new(
        generator: Participant<'a>,
        submission: Participant<'a>,
        reference: Participant<'a>,
        seed: Option<String>,
        ctx: &JudgeContext,
    ) -> Result<Judge<'a>, JudgeError> {
        let generator = Slot::build(generator, Role::Input, &ctx.build)?;
        let reference = Slot::build(reference, Role::Reference, &ctx.build)?;
        let submission = Slot::build(submission, Role::Submission, &ctx.build)?;

        let mut judge = Judge {
            generator,
            reference,
            submission,
            seed,
            classifier: ctx.classifier,
            state: EngineState::Initialized,
            base: JudgeResult::new(Verdict::Accepted),
        };

        judge.compile_all().await?;
        Ok(judge)
    }

    async fn compile_all(&mut self) -> Result<(), ContractViolation> {
        let order = [
            (Role::Input, Verdict::InvalidJudgeInput),
            (Role::Reference, Verdict::InvalidJudgeInput),
            (Role::Submission, Verdict::CompileError),
        ];

        for (role, failure) in order {
            let slot = match role {
                Role::Input => &mut self.generator,
                Role::Reference => &mut self.reference,
                Role::Submission => &mut self.submission,
            };

            match slot.adapter().compile().await {
                Ok(result) => {
                    self.base = self
                        .base
                        .clone_with(Verdict::Accepted, Some(PhaseUpdate::Compile(role, result)));
                }
                Err(AdapterError::Compile(err)) => {
                    tracing::info!(role = role.name(), error = %err, verdict = %failure, "compile failed");
                    self.base = self.base.clone_with(
                        failure,
                        Some(PhaseUpdate::Compile(role, err.to_compile_result())),
                    );
                    self.state = EngineState::CompileFailed;
                    return Ok(());
                }
                Err(AdapterError::Contract(violation)) => return Err(violation),
            }
        }

        self.state = EngineState::Compiled;
        Ok(())
    }

    /// The retained compile failure, if any participant failed to build.
    pub fn compile_failure(&self) -> Option<&JudgeResult> {
        match self.state {
            EngineState::CompileFailed => Some(&self.base),
            _ => None,
        }
    }

    /// Whether the engine will close the participant's adapter.
    pub fn owns(&self, role: Role) -> bool {
        match role {
            Role::Input => self.generator.owned(),
            Role::Reference => self.reference.owned(),
            Role::Submission => self.submission.owned(),
        }
    }

    /// Judge one test case under `limits`.
    pub async fn judge(&mut self, limits: ExecutionLimits) -> Result<JudgeResult, ContractViolation> {
        match self.state {
            EngineState::Compiled => {}
            EngineState::CompileFailed => return Ok(self.base.clone()),
            EngineState::Initialized => return Err(ContractViolation::NotCompiled),
            EngineState::Closed => return Err(ContractViolation::EngineClosed),
        }

        let seed_args: Vec<String> = self.seed.iter().cloned().collect();

        let generated = self
            .generator
            .adapter()
            .execute(&seed_args, b"", ExecutionLimits::UNLIMITED)
            .await?;

        // A cut-off input is not the test case the generator meant to write.
        if !generated.succeeded() || generated.output_truncated {
            tracing::info!(
                exit_code = generated.exit_code,
                truncated = generated.output_truncated,
                "generator failed"
            );
            return Ok(self.record(Verdict::InvalidJudgeInput, generated, None, None));
        }

        let stdin = generated.stdout.clone().into_bytes();

        let expected = self
            .reference
            .adapter()
            .execute(&[], &stdin, limits)
            .await?;

        if !expected.succeeded() || expected.output_truncated {
            tracing::info!(
                exit_code = expected.exit_code,
                truncated = expected.output_truncated,
                "reference failed"
            );
            return Ok(self.record(Verdict::InvalidJudgeInput, generated, Some(expected), None));
        }

        let actual = self
            .submission
            .adapter()
            .execute(&[], &stdin, limits)
            .await?;

        let verdict = self.classifier.classify(&actual, &expected, limits);

        tracing::info!(
            verdict = %verdict,
            wall_time_ms = actual.wall_time_ms,
            peak_memory_bytes = actual.peak_memory_bytes,
            exit_code = actual.exit_code,
            "judged"
        );

        Ok(self.record(verdict, generated, Some(expected), Some(actual)))
    }

    fn record(
        &self,
        verdict: Verdict,
        generated: ExecutionResult,
        expected: Option<ExecutionResult>,
        actual: Option<ExecutionResult>,
    ) -> JudgeResult {
        let mut result = self
            .base
            .clone_with(verdict, Some(PhaseUpdate::Execution(Role::Input, generated)));

        if let Some(expected) = expected {
            result = result.clone_with(verdict, Some(PhaseUpdate::Execution(Role::Reference, expected)));
        }
        if let Some(actual) = actual {
            result = result.clone_with(verdict, Some(PhaseUpdate::Execution(Role::Submission, actual)));
        }

        result
    }

    /// Close every engine-owned adapter that was compiled. Shared adapters
    /// are left to their owner.
    pub fn close(&mut self) -> Result<(), ContractViolation> {
        if self.state == EngineState::Closed {
            return Err(ContractViolation::EngineClosed);
        }

        for slot in [&mut self.generator, &mut self.reference, &mut self.submission] {
            if let Slot::Owned(adapter) = slot {
                if adapter.is_compiled() {
                    adapter.close()?;
                }
            }
        }

        self.state = EngineState::Closed;
        Ok(())
    }
}
