//! Judging: verdicts, per-case results, classification and the session
//! state machine that drives generator, reference and submission.

pub mod classify;
pub mod judge;
pub mod result;
pub mod verdict;

pub use classify::{tokens_equal, Classifier};
pub use judge::{Judge, JudgeContext, JudgeError, Participant};
pub use result::{JudgeResult, PhaseRecord, PhaseUpdate, Role};
pub use verdict::Verdict;
