// src/engine/verdict.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Final classification of one judged test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    #[serde(rename = "MLE")]
    MemoryLimitExceeded,
    #[serde(rename = "OLE")]
    OutputLimitExceeded,
    #[serde(rename = "PE")]
    PresentationError,
    #[serde(rename = "CE")]
    CompileError,
    #[serde(rename = "IJI")]
    InvalidJudgeInput,
}

impl Verdict {
    pub const ALL: [Verdict; 9] = [
        Verdict::Accepted,
        Verdict::WrongAnswer,
        Verdict::RuntimeError,
        Verdict::TimeLimitExceeded,
        Verdict::MemoryLimitExceeded,
        Verdict::OutputLimitExceeded,
        Verdict::PresentationError,
        Verdict::CompileError,
        Verdict::InvalidJudgeInput,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Verdict::Accepted => "AC",
            Verdict::WrongAnswer => "WA",
            Verdict::RuntimeError => "RE",
            Verdict::TimeLimitExceeded => "TLE",
            Verdict::MemoryLimitExceeded => "MLE",
            Verdict::OutputLimitExceeded => "OLE",
            Verdict::PresentationError => "PE",
            Verdict::CompileError => "CE",
            Verdict::InvalidJudgeInput => "IJI",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::MemoryLimitExceeded => "Memory Limit Exceeded",
            Verdict::OutputLimitExceeded => "Output Limit Exceeded",
            Verdict::PresentationError => "Presentation Error",
            Verdict::CompileError => "Compile Error",
            Verdict::InvalidJudgeInput => "Invalid Judge Input",
        }
    }

    /// False only for IJI: a broken generator or reference says nothing
    /// about the submission.
    pub fn is_about_submission(self) -> bool {
        !matches!(self, Verdict::InvalidJudgeInput)
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
