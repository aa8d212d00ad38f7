//! Line parser for the operation config language.
//!
//! A hand-written state machine over the fully expanded config text:
//!
//! ```text
//! new-op <label>
//!   exec shell until <TOKEN>      (script lines follow, ended by <TOKEN>)
//!   exec shell from <variable>
//!   halt-if-fail
//! var <name> is <value>
//! var <name> until <TOKEN>        (value lines follow, ended by <TOKEN>)
//! # comment
//! // comment
//! ```
//!
//! Directive keywords are case-insensitive. Terminators, `halt-if-fail`, and
//! variable names match case-sensitively. Outside a capture, a `new-op` or
//! `var` line implicitly closes the operation being defined. Operations no
//! directive ever populated are dropped.

use super::types::{Operation, RunContext};
use crate::error::{OpchainError, Result};
use regex::Regex;
use std::sync::LazyLock;

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(#|//)").expect("comment pattern"));
static NEW_OP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*new-op\s+(\S+)").expect("new-op pattern"));
static NEW_OP_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*new-op(\s|$)").expect("new-op keyword pattern"));
static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*var\s+(\S+)\s+(is|until)\s+(.+)$").expect("var pattern")
});
static VAR_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*var(\s|$)").expect("var keyword pattern"));
static SHELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*exec\s+shell\s+(from|until)\s+(\S+)").expect("exec shell pattern")
});
static SHELL_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*exec\s+shell(\s|$)").expect("exec keyword pattern"));

const HALT_IF_FAIL: &str = "halt-if-fail";

/// Parser mode. Capture modes own the text gathered so far.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState {
    TopLevel,
    DefiningOperation,
    CapturingScript(Capture),
    CapturingVariable { key: String, capture: Capture },
}

/// A hereis block in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Capture {
    terminator: String,
    buffer: String,
    opened_at: usize,
}

impl Capture {
    fn new(terminator: &str, opened_at: usize) -> Self {
        Self {
            terminator: terminator.to_string(),
            buffer: String::new(),
            opened_at,
        }
    }

    fn push_line(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }
}

/// Top-level directives: the lines that implicitly close an operation body.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    NewOp(String),
    VarIs { name: String, value: String },
    VarUntil { name: String, terminator: String },
}

/// Parse expanded config text, appending operations and variables to `ctx`.
///
/// Returns the number of operations added. `source_ref` names the input in
/// error messages; line numbers count lines of `text`.
pub fn parse_config(text: &str, source_ref: &str, ctx: &mut RunContext) -> Result<usize> {
    let mut parser = ConfigParser::new(source_ref, ctx);
    for (idx, line) in text.lines().enumerate() {
        parser.feed(idx + 1, line)?;
    }
    parser.finish()
}

struct ConfigParser<'a> {
    source_ref: &'a str,
    ctx: &'a mut RunContext,
    state: ParseState,
    current: Option<Operation>,
    stored: usize,
}

impl<'a> ConfigParser<'a> {
    fn new(source_ref: &'a str, ctx: &'a mut RunContext) -> Self {
        Self {
            source_ref,
            ctx,
            state: ParseState::TopLevel,
            current: None,
            stored: 0,
        }
    }

    fn in_capture(&self) -> bool {
        matches!(
            self.state,
            ParseState::CapturingScript(_) | ParseState::CapturingVariable { .. }
        )
    }

    fn error(&self, line_no: usize, message: impl Into<String>) -> OpchainError {
        OpchainError::parse(self.source_ref, line_no, message)
    }

    fn feed(&mut self, line_no: usize, line: &str) -> Result<()> {
        tracing::debug!("{:?} line {}: {}", self.state, line_no, line);

        let mut directive = None;
        if !self.in_capture() {
            if COMMENT_RE.is_match(line) {
                return Ok(());
            }
            directive = classify_directive(line).map_err(|msg| self.error(line_no, msg))?;
            if directive.is_some() {
                // Implicit close of the body being defined
                self.store_operation();
                self.state = ParseState::TopLevel;
            }
        }

        match std::mem::replace(&mut self.state, ParseState::TopLevel) {
            ParseState::TopLevel => {
                match directive {
                    Some(d) => self.apply_directive(line_no, d),
                    None => tracing::debug!("ignoring top-level line {}", line_no),
                }
                Ok(())
            }
            ParseState::DefiningOperation => {
                self.state = ParseState::DefiningOperation;
                self.operation_line(line_no, line)
            }
            ParseState::CapturingScript(mut capture) => {
                if line == capture.terminator {
                    if let Some(op) = self.current.as_mut() {
                        op.set_shell_script(capture.buffer);
                    }
                    self.state = ParseState::DefiningOperation;
                } else {
                    capture.push_line(line);
                    self.state = ParseState::CapturingScript(capture);
                }
                Ok(())
            }
            ParseState::CapturingVariable { key, mut capture } => {
                if line == capture.terminator {
                    tracing::debug!("setting variable {} ({} bytes)", key, capture.buffer.len());
                    self.ctx.vars.set(key, capture.buffer);
                    self.state = ParseState::DefiningOperation;
                } else {
                    capture.push_line(line);
                    self.state = ParseState::CapturingVariable { key, capture };
                }
                Ok(())
            }
        }
    }

    fn apply_directive(&mut self, line_no: usize, directive: Directive) {
        match directive {
            Directive::NewOp(label) => self.start_operation(label),
            Directive::VarIs { name, value } => {
                tracing::debug!("setting variable {}={}", name, value);
                self.ctx.vars.set(name, value);
            }
            Directive::VarUntil { name, terminator } => {
                self.state = ParseState::CapturingVariable {
                    key: name,
                    capture: Capture::new(&terminator, line_no),
                };
            }
        }
    }

    /// A line inside an operation body.
    fn operation_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        if let Some(caps) = SHELL_RE.captures(line) {
            let mode = caps[1].to_ascii_lowercase();
            let arg = caps[2].to_string();
            if self.current.is_none() {
                tracing::warn!("line {}: exec shell outside of an operation, ignored", line_no);
                return Ok(());
            }
            if mode == "from" {
                let script = self.variable_value(&arg);
                if let Some(op) = self.current.as_mut() {
                    op.set_shell_script(script);
                }
            } else {
                if let Some(op) = self.current.as_mut() {
                    op.set_shell_script(String::new());
                }
                self.state = ParseState::CapturingScript(Capture::new(&arg, line_no));
            }
            return Ok(());
        }

        if SHELL_KEYWORD_RE.is_match(line) {
            return Err(self.error(
                line_no,
                "exec shell requires `from <variable>` or `until <token>`",
            ));
        }

        if line.trim_start().starts_with(HALT_IF_FAIL) {
            if self.current.is_none() {
                tracing::warn!("line {}: halt-if-fail outside of an operation, ignored", line_no);
                return Ok(());
            }
            if let Some(op) = self.current.as_mut() {
                op.halt_if_fail = true;
                op.touch();
            }
            return Ok(());
        }

        tracing::debug!("ignoring unknown line {} in operation body", line_no);
        Ok(())
    }

    fn variable_value(&self, name: &str) -> String {
        match self.ctx.vars.get(name) {
            Some(value) => value.to_string(),
            None => {
                tracing::warn!("exec shell from undefined variable {}, using empty script", name);
                String::new()
            }
        }
    }

    fn start_operation(&mut self, label: String) {
        self.store_operation();
        if let Some(prev) = &self.current {
            tracing::debug!("discarding untouched operation {}", prev.label);
        }
        self.current = Some(Operation::new(label));
        self.state = ParseState::DefiningOperation;
    }

    /// Append the current operation if a directive populated it.
    fn store_operation(&mut self) {
        if !self.current.as_ref().is_some_and(Operation::is_touched) {
            return;
        }
        if let Some(mut op) = self.current.take() {
            trim_single_line_script(&mut op.script);
            tracing::debug!("storing operation {}", op.label);
            self.ctx.operations.push(op);
            self.stored += 1;
        }
    }

    fn finish(mut self) -> Result<usize> {
        match &self.state {
            ParseState::CapturingScript(capture) | ParseState::CapturingVariable { capture, .. } => {
                return Err(self.error(
                    capture.opened_at,
                    format!(
                        "missing terminator `{}` before end of input",
                        capture.terminator
                    ),
                ));
            }
            ParseState::TopLevel | ParseState::DefiningOperation => {}
        }
        self.store_operation();
        Ok(self.stored)
    }
}

/// Recognize a `new-op` or `var` directive. Lines that start with one of
/// those keywords but do not parse are errors.
fn classify_directive(line: &str) -> std::result::Result<Option<Directive>, String> {
    if let Some(caps) = NEW_OP_RE.captures(line) {
        return Ok(Some(Directive::NewOp(caps[1].to_string())));
    }
    if NEW_OP_KEYWORD_RE.is_match(line) {
        return Err("new-op requires a label".to_string());
    }

    if let Some(caps) = VAR_RE.captures(line) {
        let name = caps[1].to_string();
        let rest = &caps[3];
        return Ok(Some(if caps[2].eq_ignore_ascii_case("is") {
            Directive::VarIs {
                name,
                value: rest.to_string(),
            }
        } else {
            Directive::VarUntil {
                name,
                terminator: rest.trim_end().to_string(),
            }
        }));
    }
    if VAR_KEYWORD_RE.is_match(line) {
        return Err("var requires `<name> is <value>` or `<name> until <token>`".to_string());
    }

    Ok(None)
}

/// A script holding exactly one newline loses its trailing newline.
///
/// This is a count of newlines, not a line count: a script such as `"\necho"`
/// also holds one newline but has none trailing, so it is left as is.
fn trim_single_line_script(script: &mut String) {
    if script.matches('\n').count() == 1 {
        let len = script.trim_end_matches('\n').len();
        script.truncate(len);
    }
}
