// src/engine/result.rs

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::compiler::CompileResult;
use crate::engine::Verdict;
use crate::process::ExecutionResult;

/// The three programs involved in judging one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input generator (or input file)
    Input,
    /// Reference solution (or answer file)
    Reference,
    /// Contestant program
    Submission,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Input, Role::Reference, Role::Submission];

    pub fn name(self) -> &'static str {
        match self {
            Role::Input => "input",
            Role::Reference => "reference",
            Role::Submission => "submission",
        }
    }
}

/// What one participant produced. `None` means the phase was not reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub compile: Option<CompileResult>,
    pub execution: Option<ExecutionResult>,
}

/// A single field replaced by [`JudgeResult::clone_with`].
#[derive(Debug, Clone)]
pub enum PhaseUpdate {
    Compile(Role, CompileResult),
    Execution(Role, ExecutionResult),
}

/// Outcome of judging one test case, with everything each phase produced.
///
/// Never mutated after construction: later phases derive a new record
/// through [`JudgeResult::clone_with`], so a short-circuit at any phase
/// keeps the data of the phases before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeResult {
    verdict: Verdict,
    input: PhaseRecord,
    reference: PhaseRecord,
    submission: PhaseRecord,
}

impl JudgeResult {
    /// Record with a verdict and no phase data yet.
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            input: PhaseRecord::default(),
            reference: PhaseRecord::default(),
            submission: PhaseRecord::default(),
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn phase(&self, role: Role) -> &PhaseRecord {
        match role {
            Role::Input => &self.input,
            Role::Reference => &self.reference,
            Role::Submission => &self.submission,
        }
    }

    pub fn input(&self) -> &PhaseRecord {
        &self.input
    }

    pub fn reference(&self) -> &PhaseRecord {
        &self.reference
    }

    pub fn submission(&self) -> &PhaseRecord {
        &self.submission
    }

    /// A copy with a new verdict and at most one replaced field.
    pub fn clone_with(&self, verdict: Verdict, update: Option<PhaseUpdate>) -> Self {
        let mut next = self.clone();
        next.verdict = verdict;

        match update {
            Some(PhaseUpdate::Compile(role, result)) => next.phase_mut(role).compile = Some(result),
            Some(PhaseUpdate::Execution(role, result)) => {
                next.phase_mut(role).execution = Some(result)
            }
            None => {}
        }

        next
    }

    fn phase_mut(&mut self, role: Role) -> &mut PhaseRecord {
        match role {
            Role::Input => &mut self.input,
            Role::Reference => &mut self.reference,
            Role::Submission => &mut self.submission,
        }
    }

    /// Hex SHA-256 over the canonical JSON of the retained fields.
    ///
    /// Pure function of the record: identical outcomes hash identically
    /// across runs and machines.
    pub fn digest(&self) -> serde_json::Result<String> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}
