// src/engine/classify.rs

//! Verdict classification for a finished submission run.
//!
//! Precedence, first match wins:
//! 1. TLE  (time limit set and observed time >= limit)
//! 2. MLE  (memory limit set and peak memory >= limit)
//! 3. OLE  (stdout or stderr at / over the output ceiling)
//! 4. RE   (non-zero exit code)
//! 5. WA   (token sequences differ)
//! 6. PE   (tokens equal, bytes differ, strict presentation only)
//! 7. AC

use crate::config::{Config, Presentation};
use crate::engine::Verdict;
use crate::process::{ExecutionLimits, ExecutionResult};

/// Read-only comparison settings shared by every judging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    /// Output ceiling in bytes (0 disables OLE).
    pub max_output: u64,
    pub presentation: Presentation,
}

impl Classifier {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_output: cfg.max_output,
            presentation: cfg.presentation,
        }
    }

    pub fn classify(
        &self,
        submission: &ExecutionResult,
        reference: &ExecutionResult,
        limits: ExecutionLimits,
    ) -> Verdict {
        if limits.time_exceeded(submission.wall_time_ms) {
            return Verdict::TimeLimitExceeded;
        }
        if limits.memory_exceeded(submission.peak_memory_bytes) {
            return Verdict::MemoryLimitExceeded;
        }
        if self.output_exceeded(submission) {
            return Verdict::OutputLimitExceeded;
        }
        if !submission.succeeded() {
            return Verdict::RuntimeError;
        }
        if !tokens_equal(&submission.stdout, &reference.stdout) {
            return Verdict::WrongAnswer;
        }
        if self.presentation.is_strict() && submission.stdout != reference.stdout {
            return Verdict::PresentationError;
        }
        Verdict::Accepted
    }

    fn output_exceeded(&self, run: &ExecutionResult) -> bool {
        if self.max_output == 0 {
            return false;
        }
        run.output_truncated
            || run.stdout.len() as u64 >= self.max_output
            || run.stderr.len() as u64 >= self.max_output
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split([' ', '\t', '\r', '\n']).filter(|t| !t.is_empty())
}

/// Whitespace-insensitive equality: same non-empty tokens in the same order.
pub fn tokens_equal(a: &str, b: &str) -> bool {
    tokens(a).eq(tokens(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict() -> Classifier {
        Classifier {
            max_output: 64,
            presentation: Presentation::Strict,
        }
    }

    fn lenient() -> Classifier {
        Classifier {
            presentation: Presentation::Lenient,
            ..strict()
        }
    }

    fn ok(stdout: &str) -> ExecutionResult {
        ExecutionResult::from_stdout(stdout.to_string())
    }

    const LIMITS: ExecutionLimits = ExecutionLimits {
        time_limit_ms: 1000,
        memory_limit_bytes: 1 << 20,
    };

    #[test]
    fn token_comparison_ignores_layout() {
        assert!(tokens_equal("1 2\n3\n", "1\t2 3"));
        assert!(tokens_equal("", "\n\n  "));
        assert!(!tokens_equal("1 2", "12"));
        assert!(!tokens_equal("1 2", "2 1"));
    }

    #[test]
    fn exact_match_is_accepted() {
        assert_eq!(strict().classify(&ok("4\n"), &ok("4\n"), LIMITS), Verdict::Accepted);
    }

    #[test]
    fn missing_newline_is_pe_or_ac() {
        assert_eq!(
            strict().classify(&ok("4"), &ok("4\n"), LIMITS),
            Verdict::PresentationError
        );
        assert_eq!(lenient().classify(&ok("4"), &ok("4\n"), LIMITS), Verdict::Accepted);
    }

    #[test]
    fn different_tokens_are_wa() {
        assert_eq!(strict().classify(&ok("5\n"), &ok("4\n"), LIMITS), Verdict::WrongAnswer);
        assert_eq!(lenient().classify(&ok("5\n"), &ok("4\n"), LIMITS), Verdict::WrongAnswer);
    }

    #[test]
    fn nonzero_exit_is_re_whatever_the_output() {
        let mut run = ok("4\n");
        run.exit_code = 1;
        assert_eq!(strict().classify(&run, &ok("4\n"), LIMITS), Verdict::RuntimeError);

        let mut run = ok("");
        run.exit_code = 1;
        assert_eq!(strict().classify(&run, &ok("4\n"), LIMITS), Verdict::RuntimeError);
    }

    #[test]
    fn time_boundary_is_inclusive() {
        let mut run = ok("4\n");
        run.wall_time_ms = 1000;
        assert_eq!(strict().classify(&run, &ok("4\n"), LIMITS), Verdict::TimeLimitExceeded);

        run.wall_time_ms = 999;
        assert_eq!(strict().classify(&run, &ok("4\n"), LIMITS), Verdict::Accepted);
    }

    #[test]
    fn zero_limits_never_classify_as_breach() {
        let mut run = ok("4\n");
        run.wall_time_ms = u64::MAX;
        run.peak_memory_bytes = u64::MAX;
        assert_eq!(
            strict().classify(&run, &ok("4\n"), ExecutionLimits::UNLIMITED),
            Verdict::Accepted
        );
    }

    #[test]
    fn precedence_time_memory_output_runtime() {
        let mut run = ok(&"x".repeat(100));
        run.exit_code = 137;
        run.wall_time_ms = 1000;
        run.peak_memory_bytes = 1 << 20;
        assert_eq!(strict().classify(&run, &ok(""), LIMITS), Verdict::TimeLimitExceeded);

        run.wall_time_ms = 10;
        assert_eq!(strict().classify(&run, &ok(""), LIMITS), Verdict::MemoryLimitExceeded);

        run.peak_memory_bytes = 10;
        assert_eq!(strict().classify(&run, &ok(""), LIMITS), Verdict::OutputLimitExceeded);

        run.stdout.clear();
        assert_eq!(strict().classify(&run, &ok(""), LIMITS), Verdict::RuntimeError);
    }

    #[test]
    fn stderr_and_truncation_count_for_ole() {
        let mut run = ok("4\n");
        run.stderr = "e".repeat(64);
        assert_eq!(strict().classify(&run, &ok("4\n"), LIMITS), Verdict::OutputLimitExceeded);

        let mut run = ok("4\n");
        run.output_truncated = true;
        assert_eq!(strict().classify(&run, &ok("4\n"), LIMITS), Verdict::OutputLimitExceeded);

        let unlimited = Classifier {
            max_output: 0,
            ..strict()
        };
        let run = ok(&"x".repeat(1000));
        assert_eq!(unlimited.classify(&run, &ok(&"x".repeat(1000)), LIMITS), Verdict::Accepted);
    }
}
