//! Run recorder — per-operation state files in the state directory.
//!
//! Each executed operation leaves three siblings named from its sequence
//! number and label:
//!
//! - `00001.<label>.output` — raw combined output
//! - `00001.<label>.exitcode` — decimal exit code
//! - `00001.<label>.run.json` — [`RunSummary`] document
//!
//! Sequence numbers restart at 1 every run; there is no locking.

use super::timestamp::format_timestamp;
use super::types::{OpResult, Operation, RunSummary};
use crate::error::{OpchainError, Result};
use std::path::{Path, PathBuf};

/// Default state directory.
pub const DEFAULT_STATE_DIR: &str = "/var/tmp/opchain";

/// Derive a state file path for an operation.
pub fn op_file_path(state_dir: &Path, sequence: u32, label: &str, suffix: &str) -> PathBuf {
    state_dir.join(format!(
        "{:05}.{}.{}",
        sequence,
        file_safe_label(label),
        suffix
    ))
}

/// Labels may contain path separators; keep every file inside the state dir.
fn file_safe_label(label: &str) -> String {
    label.replace(['/', '\\'], "_")
}

/// Write all three state files for an executed operation. Returns the output
/// file path. Any failed write is fatal to the run.
pub fn record_operation(
    state_dir: &Path,
    sequence: u32,
    op: &Operation,
    result: &OpResult,
) -> Result<PathBuf> {
    let output_file = op_file_path(state_dir, sequence, &op.label, "output");
    write_atomic(&output_file, &result.output)?;

    let exit_file = op_file_path(state_dir, sequence, &op.label, "exitcode");
    write_atomic(&exit_file, result.exit_code.to_string().as_bytes())?;

    let summary = summarize(sequence, op, result, &output_file);
    let mut json = serde_json::to_string_pretty(&summary)?;
    json.push('\n');
    let run_file = op_file_path(state_dir, sequence, &op.label, "run.json");
    write_atomic(&run_file, json.as_bytes())?;

    Ok(output_file)
}

/// Build the run.json document for an executed operation.
pub fn summarize(sequence: u32, op: &Operation, result: &OpResult, output_file: &Path) -> RunSummary {
    RunSummary {
        label: op.label.clone(),
        sequence,
        command: op.command.clone(),
        command_path: result
            .command_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        args: op.args.clone(),
        script: op.script.clone(),
        success: result.success(),
        exit_code: result.exit_code,
        halt_if_fail: op.halt_if_fail,
        start_time: format_timestamp(result.started_at),
        end_time: format_timestamp(result.ended_at),
        run_time: result.elapsed.as_secs_f64(),
        run_error: result.run_error.clone().unwrap_or_default(),
        output_is_empty: result.output_is_empty(),
        output_file: output_file.display().to_string(),
    }
}

/// Write to a temp sibling, then rename over the target.
fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);
    std::fs::write(&tmp_path, body).map_err(|e| OpchainError::persist(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| OpchainError::persist(path, e))?;
    Ok(())
}

/// Create the state directory if needed, restricted to the owner on unix.
/// With `nuke`, everything already inside it is removed first.
pub fn prepare_state_dir(state_dir: &Path, nuke: bool) -> Result<()> {
    if nuke && state_dir.exists() {
        tracing::info!("removing contents of {}", state_dir.display());
        for entry in std::fs::read_dir(state_dir)? {
            let path = entry?.path();
            let removed = if path.is_dir() && !path.is_symlink() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.map_err(|e| OpchainError::persist(&path, e))?;
        }
    }

    std::fs::create_dir_all(state_dir).map_err(|e| OpchainError::persist(state_dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(state_dir, std::fs::Permissions::from_mode(0o700))
            .map_err(|e| OpchainError::persist(state_dir, e))?;
    }

    Ok(())
}

/// Load every `*.run.json` in the state directory, ordered by file name.
pub fn load_summaries(state_dir: &Path) -> Result<Vec<RunSummary>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(state_dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".run.json"))
        })
        .collect();
    paths.sort();

    let mut summaries = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path)?;
        summaries.push(serde_json::from_str(&content)?);
    }
    Ok(summaries)
}
