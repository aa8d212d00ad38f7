//! Operation, result, and run-summary types.
//!
//! An [`Operation`] is what the parser produces; an [`OpResult`] is what the
//! executor produces for it. The two are joined into a [`RunSummary`] when the
//! recorder writes `run.json`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Shell binary used by `exec shell` operations.
pub const SHELL_COMMAND: &str = "sh";

/// Arguments passed to the shell; the script itself arrives on stdin.
pub const SHELL_ARGS: &[&str] = &["-sex"];

// ============================================================================
// Operations
// ============================================================================

/// A named unit of work: a command plus the script fed to it on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Label from the `new-op` directive
    pub label: String,

    /// Command to launch (looked up on `$PATH`)
    pub command: String,

    /// Command arguments
    pub args: Vec<String>,

    /// Script text written to the process's stdin
    pub script: String,

    /// Stop the run if this operation fails
    pub halt_if_fail: bool,

    touched: bool,
}

impl Operation {
    /// Open a new, untouched operation. It runs via the shell unless told otherwise.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: SHELL_COMMAND.to_string(),
            args: SHELL_ARGS.iter().map(|a| a.to_string()).collect(),
            script: String::new(),
            halt_if_fail: false,
            touched: false,
        }
    }

    /// A populated shell operation.
    pub fn shell(label: impl Into<String>, script: impl Into<String>) -> Self {
        let mut op = Self::new(label);
        op.set_shell_script(script);
        op
    }

    /// Set the script and switch the command to the shell.
    pub fn set_shell_script(&mut self, script: impl Into<String>) {
        self.command = SHELL_COMMAND.to_string();
        self.args = SHELL_ARGS.iter().map(|a| a.to_string()).collect();
        self.script = script.into();
        self.touched = true;
    }

    /// Mark the operation populated.
    pub fn touch(&mut self) {
        self.touched = true;
    }

    /// True once a directive has populated the operation body.
    pub fn is_touched(&self) -> bool {
        self.touched
    }
}

// ============================================================================
// Execution results
// ============================================================================

/// Outcome of executing one operation exactly once.
#[derive(Debug, Clone)]
pub struct OpResult {
    /// Resolved path of the command, if `$PATH` lookup succeeded
    pub command_path: Option<PathBuf>,

    /// Process exit code (-1 when the process never ran or was killed by a signal)
    pub exit_code: i32,

    /// Wall-clock start
    pub started_at: SystemTime,

    /// Wall-clock end
    pub ended_at: SystemTime,

    /// Elapsed run time
    pub elapsed: Duration,

    /// Combined stdout/stderr, exactly as the process wrote it
    pub output: Vec<u8>,

    /// Set when the process could not be launched or its output not captured
    pub run_error: Option<String>,
}

impl OpResult {
    /// Success is strictly exit code zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn output_is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Output decoded for display; invalid UTF-8 becomes U+FFFD.
    pub fn output_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}

// ============================================================================
// run.json
// ============================================================================

/// Structured per-operation summary persisted as `<seq>.<label>.run.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub label: String,
    #[serde(rename = "opCounter")]
    pub sequence: u32,
    pub command: String,
    pub command_path: String,
    pub args: Vec<String>,
    #[serde(rename = "stdin")]
    pub script: String,
    pub success: bool,
    pub exit_code: i32,
    pub halt_if_fail: bool,
    pub start_time: String,
    pub end_time: String,
    /// Elapsed seconds
    pub run_time: f64,
    pub run_error: String,
    pub output_is_empty: bool,
    pub output_file: String,
}

// ============================================================================
// Variables and run context
// ============================================================================

/// Flat name → value mapping. Last write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarStore {
    vars: IndexMap<String, String>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Everything the parse phase produces. Mutated only while parsing, then
/// handed to the executor as read-only.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub vars: VarStore,
    pub operations: Vec<Operation>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a pre-seeded variable store (e.g. OS detection).
    pub fn with_vars(vars: VarStore) -> Self {
        Self {
            vars,
            operations: Vec::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
