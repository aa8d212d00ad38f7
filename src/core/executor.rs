//! Executor — the sequential run loop.
//!
//! For each operation in list order: assign the next sequence number, run it
//! exactly once, record the outcome in the state directory, echo it if asked,
//! then stop if it failed with halt-if-fail set.

use super::state;
use super::types::{OpResult, Operation};
use crate::error::{OpchainError, Result};
use crate::transport;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

/// Settings for a run.
pub struct RunConfig<'a> {
    pub state_dir: &'a Path,
    /// Echo command, input, and output of every operation
    pub verbose: bool,
}

/// Totals for a run that was not halted.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub executed: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub total_duration: Duration,
}

/// Run one operation and capture its outcome. Launch failures are recorded in
/// the result, never returned as errors.
pub fn execute_operation(op: &Operation) -> OpResult {
    let command_path = transport::lookup_command(&op.command);
    let started_at = SystemTime::now();
    let clock = Instant::now();

    let outcome = match &command_path {
        Some(path) => transport::local::exec_local(path, &op.args, &op.script),
        None => Err(format!(
            "exec: \"{}\": executable file not found in $PATH",
            op.command
        )),
    };

    let elapsed = clock.elapsed();
    let ended_at = SystemTime::now();

    let (exit_code, output, run_error) = match outcome {
        Ok(out) => (out.exit_code, out.output, out.error),
        Err(e) => (-1, Vec::new(), Some(e)),
    };

    OpResult {
        command_path,
        exit_code,
        started_at,
        ended_at,
        elapsed,
        output,
        run_error,
    }
}

/// Run every operation, echoing to stdout when verbose.
pub fn run(operations: &[Operation], cfg: &RunConfig) -> Result<RunReport> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_output(operations, cfg, &mut out)
}

/// Run every operation, echoing to `out` when verbose.
///
/// Returns [`OpchainError::Halted`] when a halt-if-fail operation fails, and
/// a persistence error if any state file cannot be written.
pub fn run_with_output<W: Write>(
    operations: &[Operation],
    cfg: &RunConfig,
    out: &mut W,
) -> Result<RunReport> {
    let run_start = Instant::now();
    let mut report = RunReport {
        executed: 0,
        succeeded: 0,
        failed: 0,
        total_duration: Duration::ZERO,
    };

    for (sequence, op) in (1u32..).zip(operations) {
        tracing::info!("op #{} {}: starting", sequence, op.label);
        let result = execute_operation(op);
        let output_file = state::record_operation(cfg.state_dir, sequence, op, &result)?;
        tracing::info!(
            "op #{} {}: exit code {} in {:.3}s ({})",
            sequence,
            op.label,
            result.exit_code,
            result.elapsed.as_secs_f64(),
            output_file.display()
        );

        if cfg.verbose {
            echo_operation(out, sequence, op, &result)?;
        }

        report.executed += 1;
        if result.success() {
            report.succeeded += 1;
        } else {
            report.failed += 1;
            if op.halt_if_fail {
                return Err(OpchainError::Halted {
                    sequence,
                    label: op.label.clone(),
                });
            }
        }
    }

    report.total_duration = run_start.elapsed();
    Ok(report)
}

/// Print one operation's command, input, and output block.
fn echo_operation<W: Write>(
    out: &mut W,
    sequence: u32,
    op: &Operation,
    result: &OpResult,
) -> Result<()> {
    if sequence > 1 {
        writeln!(out)?;
    }
    let command_path = result
        .command_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    writeln!(out, "--- op #{} --> {} ---------------", sequence, op.label)?;
    writeln!(out, "command: {} {}", command_path, op.args.join(" "))?;
    writeln!(out, "exit code: {}", result.exit_code)?;
    if let Some(ref e) = result.run_error {
        writeln!(out, "run error: {}", e)?;
    }
    writeln!(out, "(stdin)\n{}", op.script)?;
    writeln!(out, "(output)\n{}", result.output_text().trim())?;
    Ok(())
}
