// src/watchdog.rs

//! Limit enforcement for a running child process.
//!
//! The watchdog runs on its own thread next to the async task that feeds
//! and drains the child. On every tick it samples:
//! - Wall-clock time since the child was spawned
//! - Resident memory (RSS) of the child, via `sysinfo`
//!
//! When a non-zero limit is met or exceeded, the child is killed and the
//! breach is recorded. The only state shared with the caller is the stop
//! flag; the report (peak memory + breach) is handed back once through
//! the thread's join handle.
//!
//! Notes:
//! - Extremely short-lived spikes between two samples are not captured.
//! - Memory is the RSS of the direct child only.
//! - On unix the child leads its own process group and a breach kills the
//!   whole group. Once the direct child has exited, the time limit keeps
//!   being enforced on the group until the caller stops the watchdog, so
//!   a leftover descendant holding the output pipes cannot stall judging.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessStatus, System};

use crate::process::ExecutionLimits;

/// Which limit the watchdog enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breach {
    Time,
    Memory,
}

/// Final readings handed back when the watchdog stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchdogReport {
    /// Highest RSS seen, in bytes.
    pub peak_memory_bytes: u64,

    /// Limit that caused a kill, if any.
    pub breach: Option<Breach>,
}

/// Samples one child process until it exits, breaches, or is stopped.
pub struct Watchdog {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<WatchdogReport>>,
}

impl Watchdog {
    /// Start watching `pid`.
    ///
    /// - `started`: instant the child was spawned (wall time origin)
    /// - `limits`: zero means "unlimited" for each dimension
    /// - `sample_every`: polling interval (15ms by default)
    pub fn start(
        pid_u32: u32,
        started: Instant,
        limits: ExecutionLimits,
        sample_every: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            sample_until_done(pid_u32, started, limits, sample_every, &stop_clone)
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the sampling loop to stop and collect its report.
    ///
    /// Blocks for at most one sampling interval.
    pub fn stop_and_take(mut self) -> WatchdogReport {
        self.stop.store(true, Ordering::Relaxed);

        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                tracing::warn!("watchdog thread panicked, limits not reported");
                WatchdogReport::default()
            }),
            None => WatchdogReport::default(),
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn sample_until_done(
    pid_u32: u32,
    started: Instant,
    limits: ExecutionLimits,
    sample_every: Duration,
    stop: &AtomicBool,
) -> WatchdogReport {
    let pid = Pid::from_u32(pid_u32);
    let mut system = System::new();
    let mut report = WatchdogReport::default();
    let mut child_running = true;

    loop {
        // Set only after the child has been reaped; nothing left to police.
        if stop.load(Ordering::Relaxed) {
            break;
        }

        if child_running {
            match resident_memory(&mut system, pid) {
                Some(rss) => report.peak_memory_bytes = report.peak_memory_bytes.max(rss),
                None => {
                    tracing::debug!(pid = pid_u32, "child exited, watching its group");
                    child_running = false;
                    if !cfg!(unix) {
                        break;
                    }
                }
            }
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let breach = if limits.time_exceeded(elapsed_ms) {
            Some(Breach::Time)
        } else if child_running && limits.memory_exceeded(report.peak_memory_bytes) {
            Some(Breach::Memory)
        } else {
            None
        };

        if let Some(breach) = breach {
            if !kill_group(&system, pid) {
                tracing::warn!(pid = pid_u32, ?breach, "failed to kill child on limit breach");
            }
            tracing::debug!(
                pid = pid_u32,
                ?breach,
                elapsed_ms,
                peak_memory_bytes = report.peak_memory_bytes,
                "limit breached, child killed"
            );
            report.breach = Some(breach);
            break;
        }

        thread::sleep(sample_every);
    }

    report
}

/// RSS of a live child. `None` once it is gone or a zombie.
fn resident_memory(system: &mut System, pid: Pid) -> Option<u64> {
    if !system.refresh_process(pid) {
        return None;
    }

    let process = system.process(pid)?;
    match process.status() {
        ProcessStatus::Zombie | ProcessStatus::Dead => None,
        _ => Some(process.memory()),
    }
}

/// SIGKILL the child's process group, falling back to the child alone.
fn kill_group(system: &System, pid: Pid) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};

        if let Ok(raw) = i32::try_from(pid.as_u32()) {
            match killpg(nix::unistd::Pid::from_raw(raw), Signal::SIGKILL) {
                Ok(()) => return true,
                Err(e) => tracing::debug!(pid = raw, error = %e, "killpg failed"),
            }
        }
    }

    system.process(pid).is_some_and(|process| process.kill())
}
