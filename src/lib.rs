//! oijudge
//!
//! Runs a submission against a reference program and an input generator
//! under time and memory limits and classifies the outcome.
//!
//! Layers, leaf first:
//! - [`process`]: one child process under limits, sampled by [`watchdog`]
//! - [`compiler`]: turns a source path into a compiled, executable,
//!   closeable [`compiler::Adapter`]
//! - [`engine`]: the judging state machine and verdict classification
//!
//! `cli`, `runner` and `report` make up the command-line tool on top.

pub mod cli;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod process;
pub mod report;
pub mod runner;
pub mod tmp;
pub mod util;
pub mod validate;
pub mod watchdog;
