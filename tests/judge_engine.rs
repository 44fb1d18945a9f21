#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use oijudge::compiler::{Adapter, ContractViolation, SourceKind};
use oijudge::config::{Config, Presentation};
use oijudge::engine::{Judge, JudgeContext, Participant, Verdict};
use oijudge::process::{ExecutionLimits, ProcessExecutor};
use oijudge::tmp::TempStore;

const LIMITS: ExecutionLimits = ExecutionLimits {
    time_limit_ms: 5_000,
    memory_limit_bytes: 0,
};

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn config(presentation: Presentation) -> Config {
    let mut cfg = Config::default();
    cfg.presentation = presentation;
    cfg.sample_interval_ms = 10;
    cfg
}

fn context(cfg: &Config) -> JudgeContext {
    JudgeContext::new(cfg, Arc::new(TempStore::managed().unwrap()))
}

/// A shell script run through `sh`; the kind only labels it.
fn sh(dir: &Path, name: &str, body: &str) -> Adapter {
    let path = write(dir, name, body);
    Adapter::script(
        path,
        SourceKind::Python3,
        argv(&["sh", "{source_file}"]),
        ProcessExecutor::default(),
    )
}

async fn judge_once(
    ctx: &JudgeContext,
    generator: Adapter,
    submission: Adapter,
    reference: Adapter,
    limits: ExecutionLimits,
) -> oijudge::engine::JudgeResult {
    let mut judge = Judge::new(
        Participant::Owned(generator),
        Participant::Owned(submission),
        Participant::Owned(reference),
        None,
        ctx,
    )
    .await
    .unwrap();

    let result = judge.judge(limits).await.unwrap();
    judge.close().unwrap();
    result
}

#[tokio::test]
async fn matching_answer_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let result = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "2 3\n")),
        sh(dir.path(), "sub.sh", "read a b\necho $((a + b))\n"),
        sh(dir.path(), "ref.sh", "read a b\necho $((a + b))\n"),
        LIMITS,
    )
    .await;

    assert_eq!(result.verdict(), Verdict::Accepted);
    assert_eq!(result.input().execution.as_ref().unwrap().stdout, "2 3\n");
    assert_eq!(result.reference().execution.as_ref().unwrap().stdout, "5\n");
    assert_eq!(result.submission().execution.as_ref().unwrap().stdout, "5\n");
    assert!(result.submission().compile.as_ref().unwrap().succeeded());
}

#[tokio::test]
async fn missing_newline_depends_on_presentation() {
    let dir = tempfile::tempdir().unwrap();

    for (presentation, expected) in [
        (Presentation::Strict, Verdict::PresentationError),
        (Presentation::Lenient, Verdict::Accepted),
    ] {
        let ctx = context(&config(presentation));
        let result = judge_once(
            &ctx,
            Adapter::file(write(dir.path(), "1.in", "")),
            sh(dir.path(), "sub.sh", "printf 4\n"),
            sh(dir.path(), "ref.sh", "echo 4\n"),
            LIMITS,
        )
        .await;

        assert_eq!(result.verdict(), expected);
    }
}

#[tokio::test]
async fn carriage_returns_do_not_cause_pe() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let result = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "")),
        sh(dir.path(), "sub.sh", "printf '4\\r\\n'\n"),
        sh(dir.path(), "ref.sh", "echo 4\n"),
        LIMITS,
    )
    .await;

    assert_eq!(result.verdict(), Verdict::Accepted);
}

#[tokio::test]
async fn wrong_and_crashing_submissions() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let wrong = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "")),
        sh(dir.path(), "wa.sh", "echo 5\n"),
        sh(dir.path(), "ref.sh", "echo 4\n"),
        LIMITS,
    )
    .await;
    assert_eq!(wrong.verdict(), Verdict::WrongAnswer);

    let crashed = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "")),
        sh(dir.path(), "re.sh", "echo 4\nexit 1\n"),
        sh(dir.path(), "ref.sh", "echo 4\n"),
        LIMITS,
    )
    .await;
    assert_eq!(crashed.verdict(), Verdict::RuntimeError);
    assert_eq!(crashed.submission().execution.as_ref().unwrap().exit_code, 1);
}

#[tokio::test]
async fn slow_submission_is_tle_with_clamped_time() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));
    let limits = ExecutionLimits::new(200, 0);

    let result = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "")),
        sh(dir.path(), "slow.sh", "exec sleep 5\n"),
        sh(dir.path(), "ref.sh", "echo 4\n"),
        limits,
    )
    .await;

    assert_eq!(result.verdict(), Verdict::TimeLimitExceeded);
    assert_eq!(result.submission().execution.as_ref().unwrap().wall_time_ms, 200);
}

#[tokio::test]
async fn slow_script_with_child_processes_is_still_tle() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));
    let limits = ExecutionLimits::new(200, 0);
    let started = std::time::Instant::now();

    let result = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "")),
        sh(dir.path(), "slow.sh", "sleep 4\necho 4\n"),
        Adapter::file(write(dir.path(), "1.ans", "4\n")),
        limits,
    )
    .await;

    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert_eq!(result.verdict(), Verdict::TimeLimitExceeded);
    assert_eq!(result.submission().execution.as_ref().unwrap().wall_time_ms, 200);
}

#[tokio::test]
async fn memory_hungry_submission_is_mle_with_clamped_peak() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));
    let limits = ExecutionLimits::new(5_000, 64 * 1024);

    let result = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "")),
        sh(dir.path(), "big.sh", "exec sleep 5\n"),
        Adapter::file(write(dir.path(), "1.ans", "4\n")),
        limits,
    )
    .await;

    assert_eq!(result.verdict(), Verdict::MemoryLimitExceeded);
    let run = result.submission().execution.as_ref().unwrap();
    assert_eq!(run.peak_memory_bytes, 64 * 1024);
    assert!(run.wall_time_ms < 5_000);
}

#[tokio::test]
async fn oversized_generator_output_is_iji() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(Presentation::Strict);
    cfg.max_output = 8;
    let ctx = context(&cfg);

    let generator = Adapter::script(
        write(dir.path(), "gen.sh", "printf '%0100d' 0\n"),
        SourceKind::Python3,
        argv(&["sh", "{source_file}"]),
        ProcessExecutor::from_config(&cfg),
    );

    let result = judge_once(
        &ctx,
        generator,
        sh(dir.path(), "sub.sh", "cat\n"),
        sh(dir.path(), "ref.sh", "cat\n"),
        LIMITS,
    )
    .await;

    assert_eq!(result.verdict(), Verdict::InvalidJudgeInput);
    assert!(result.input().execution.as_ref().unwrap().output_truncated);
    assert!(result.reference().execution.is_none());
    assert!(result.submission().execution.is_none());
}

#[tokio::test]
async fn flooding_submission_is_ole() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(Presentation::Strict);
    cfg.max_output = 8;
    let ctx = context(&cfg);

    let result = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "")),
        sh(dir.path(), "flood.sh", "printf '%0100d' 0\n"),
        sh(dir.path(), "ref.sh", "echo 4\n"),
        LIMITS,
    )
    .await;

    assert_eq!(result.verdict(), Verdict::OutputLimitExceeded);
}

#[tokio::test]
async fn failing_generator_is_iji_and_stops_early() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let result = judge_once(
        &ctx,
        sh(dir.path(), "gen.sh", "echo partial\nexit 2\n"),
        sh(dir.path(), "sub.sh", "echo 4\n"),
        sh(dir.path(), "ref.sh", "echo 4\n"),
        LIMITS,
    )
    .await;

    assert_eq!(result.verdict(), Verdict::InvalidJudgeInput);
    assert!(!result.verdict().is_about_submission());

    let generated = result.input().execution.as_ref().unwrap();
    assert_eq!(generated.exit_code, 2);
    assert_eq!(generated.stdout, "partial\n");
    assert!(result.reference().execution.is_none());
    assert!(result.submission().execution.is_none());
}

#[tokio::test]
async fn failing_reference_is_iji() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let result = judge_once(
        &ctx,
        Adapter::file(write(dir.path(), "1.in", "")),
        sh(dir.path(), "sub.sh", "echo 4\n"),
        sh(dir.path(), "ref.sh", "exit 1\n"),
        LIMITS,
    )
    .await;

    assert_eq!(result.verdict(), Verdict::InvalidJudgeInput);
    assert_eq!(result.reference().execution.as_ref().unwrap().exit_code, 1);
    assert!(result.submission().execution.is_none());
}

#[tokio::test]
async fn broken_submission_is_ce_on_every_judgement() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));
    let temps = Arc::new(TempStore::managed().unwrap());

    let submission = Adapter::native(
        write(dir.path(), "sub.cpp", "int main() {"),
        SourceKind::Cpp,
        argv(&["sh", "-c", "echo boom >&2; exit 3"]),
        ProcessExecutor::default(),
        Arc::clone(&temps),
    );

    let mut judge = Judge::new(
        Participant::Owned(Adapter::file(write(dir.path(), "1.in", ""))),
        Participant::Owned(submission),
        Participant::Owned(sh(dir.path(), "ref.sh", "echo 4\n")),
        None,
        &ctx,
    )
    .await
    .unwrap();

    assert!(judge.compile_failure().is_some());

    let first = judge.judge(LIMITS).await.unwrap();
    let second = judge.judge(LIMITS).await.unwrap();

    assert_eq!(first.verdict(), Verdict::CompileError);
    assert_eq!(first, second);

    let compile = first.submission().compile.as_ref().unwrap();
    assert_eq!(compile.exit_code, 3);
    assert!(compile.diagnostic_text.contains("boom"));
    assert!(first.input().compile.as_ref().unwrap().succeeded());
    assert!(first.submission().execution.is_none());
    assert_eq!(temps.outstanding(), 0);

    judge.close().unwrap();
}

#[tokio::test]
async fn broken_generator_is_iji_before_submission_builds() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let generator = Adapter::native(
        write(dir.path(), "gen.c", ""),
        SourceKind::C,
        argv(&["sh", "-c", "exit 1"]),
        ProcessExecutor::default(),
        Arc::new(TempStore::managed().unwrap()),
    );

    let mut judge = Judge::new(
        Participant::Owned(generator),
        Participant::Owned(sh(dir.path(), "sub.sh", "echo 4\n")),
        Participant::Owned(sh(dir.path(), "ref.sh", "echo 4\n")),
        None,
        &ctx,
    )
    .await
    .unwrap();

    let result = judge.judge(LIMITS).await.unwrap();
    assert_eq!(result.verdict(), Verdict::InvalidJudgeInput);
    assert_eq!(result.input().compile.as_ref().unwrap().exit_code, 1);
    assert!(result.reference().compile.is_none());
    assert!(result.submission().compile.is_none());

    judge.close().unwrap();
}

#[tokio::test]
async fn seed_is_passed_to_the_generator() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let mut judge = Judge::new(
        Participant::Owned(sh(dir.path(), "gen.sh", "echo \"$1\"\n")),
        Participant::Owned(sh(dir.path(), "sub.sh", "cat\n")),
        Participant::Owned(sh(dir.path(), "ref.sh", "cat\n")),
        Some("42".to_string()),
        &ctx,
    )
    .await
    .unwrap();

    let result = judge.judge(LIMITS).await.unwrap();
    assert_eq!(result.verdict(), Verdict::Accepted);
    assert_eq!(result.input().execution.as_ref().unwrap().stdout, "42\n");
    assert_eq!(result.submission().execution.as_ref().unwrap().stdout, "42\n");

    judge.close().unwrap();
}

#[tokio::test]
async fn sequence_input_cycles_across_judgements() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    write(dir.path(), "case.1", "1\n");
    write(dir.path(), "case.2", "2\n");

    let mut judge = Judge::new(
        Participant::Owned(Adapter::sequence(dir.path().join("case.*"))),
        Participant::Owned(sh(dir.path(), "sub.sh", "read x\necho $((x * 2))\n")),
        Participant::Owned(sh(dir.path(), "ref.sh", "read x\necho $((x + x))\n")),
        None,
        &ctx,
    )
    .await
    .unwrap();

    let mut inputs = Vec::new();
    for _ in 0..3 {
        let result = judge.judge(LIMITS).await.unwrap();
        assert_eq!(result.verdict(), Verdict::Accepted);
        inputs.push(result.input().execution.as_ref().unwrap().stdout.clone());
    }

    assert_eq!(inputs, vec!["1\n", "2\n", "1\n"]);
    judge.close().unwrap();
}

#[tokio::test]
async fn shared_submission_outlives_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let mut submission = sh(dir.path(), "sub.sh", "echo 4\n");
    submission.compile().await.unwrap();

    for _ in 0..2 {
        let mut judge = Judge::new(
            Participant::Owned(Adapter::file(write(dir.path(), "1.in", ""))),
            Participant::Shared(&mut submission),
            Participant::Owned(Adapter::file(write(dir.path(), "1.ans", "4\n"))),
            None,
            &ctx,
        )
        .await
        .unwrap();

        assert!(!judge.owns(oijudge::engine::Role::Submission));
        assert_eq!(judge.judge(LIMITS).await.unwrap().verdict(), Verdict::Accepted);

        judge.close().unwrap();
        assert_eq!(judge.close(), Err(ContractViolation::EngineClosed));
        assert_eq!(judge.judge(LIMITS).await, Err(ContractViolation::EngineClosed));
    }

    assert!(submission.is_compiled());
    submission.close().unwrap();
    assert_eq!(submission.close(), Err(ContractViolation::AlreadyClosed));
}

#[tokio::test]
async fn native_build_runs_once_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();
    let temps = Arc::new(TempStore::in_dir(artifacts.path()).unwrap());
    let log = dir.path().join("builds.log");

    let script = format!(
        "echo built >> '{}'; cp \"$0\" \"$1\" && chmod +x \"$1\"",
        log.display()
    );

    let mut adapter = Adapter::native(
        write(dir.path(), "prog.c", "#!/bin/sh\necho native\n"),
        SourceKind::C,
        argv(&["sh", "-c", &script, "{source_file}", "{output_file}"]),
        ProcessExecutor::default(),
        Arc::clone(&temps),
    );

    let first = adapter.compile().await.unwrap();
    let second = adapter.compile().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read_to_string(&log).unwrap().lines().count(), 1);
    assert_eq!(temps.outstanding(), 1);

    let run = adapter.execute(&[], b"", LIMITS).await.unwrap();
    assert_eq!(run.stdout, "native\n");

    adapter.close().unwrap();
    assert_eq!(temps.outstanding(), 0);
    assert_eq!(std::fs::read_dir(artifacts.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn participants_can_be_auto_detected() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(Presentation::Strict);
    cfg.toolchains
        .insert("python3".to_string(), argv(&["sh", "{source_file}"]));
    let ctx = context(&cfg);

    let input = write(dir.path(), "in.txt", "3\n");
    let answer = write(dir.path(), "answer.out", "9\n");
    let code = write(dir.path(), "sol.py", "read x\necho $((x * x))\n");

    let mut judge = Judge::new(
        Participant::source(input),
        Participant::source(code),
        Participant::source(answer),
        None,
        &ctx,
    )
    .await
    .unwrap();

    assert!(judge.owns(oijudge::engine::Role::Submission));
    assert_eq!(judge.judge(LIMITS).await.unwrap().verdict(), Verdict::Accepted);
    judge.close().unwrap();
}

#[tokio::test]
async fn unknown_type_override_is_a_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(&config(Presentation::Strict));

    let outcome = Judge::new(
        Participant::source(write(dir.path(), "1.in", "")),
        Participant::source_as(write(dir.path(), "sub.x", ""), Some("cobol".to_string())),
        Participant::source(write(dir.path(), "1.ans", "")),
        None,
        &ctx,
    )
    .await;

    assert!(outcome.is_err());
}
