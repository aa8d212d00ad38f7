//! Local subprocess execution with the script piped to stdin.
//!
//! stdout and stderr share one pipe, so the captured output interleaves the
//! two streams in the order the process wrote them.

use super::ExecOutput;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

/// Run `program` with `args`, feeding `stdin_text` on stdin and inheriting the
/// environment. Returns `Err` only if the process could not be launched.
pub fn exec_local(program: &Path, args: &[String], stdin_text: &str) -> Result<ExecOutput, String> {
    let (mut reader, writer) =
        std::io::pipe().map_err(|e| format!("cannot create output pipe: {}", e))?;
    let writer_err = writer
        .try_clone()
        .map_err(|e| format!("cannot clone output pipe: {}", e))?;

    let mut child = {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(writer)
            .stderr(writer_err);
        cmd.spawn()
            .map_err(|e| format!("failed to spawn {}: {}", program.display(), e))?
        // cmd drops here, closing our copies of the write end
    };

    // Feed stdin from a helper thread so a chatty child can't deadlock us
    let feeder = child.stdin.take().map(|mut stdin| {
        let script = stdin_text.to_owned();
        std::thread::spawn(move || stdin.write_all(script.as_bytes()))
    });

    let mut raw = Vec::new();
    let read_result = reader.read_to_end(&mut raw);

    let status = child
        .wait()
        .map_err(|e| format!("wait error: {}", e))?;

    let mut error = None;
    if let Err(e) = read_result {
        error = Some(format!("cannot capture output: {}", e));
    }
    if let Some(handle) = feeder {
        match handle.join() {
            Ok(Ok(())) => {}
            // The process exited without reading all of its input
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => error = error.or(Some(format!("stdin write error: {}", e))),
            Err(_) => error = error.or(Some("stdin writer panicked".to_string())),
        }
    }

    let exit_code = match status.code() {
        Some(code) => code,
        None => {
            error = error.or(Some(format!("process terminated: {}", status)));
            -1
        }
    };

    Ok(ExecOutput {
        exit_code,
        output: raw,
        error,
    })
}
