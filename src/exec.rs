//! Subprocess plumbing for command-kind engines
//!
//! Recognizer, translator, and synthesis backends of the `command` kind
//! all invoke a configured executable with a templated argument list and
//! a hard deadline. A hung engine becomes a typed timeout, never an
//! indefinitely blocked session.

use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use crate::{Error, Result};

/// Substitute `{name}` placeholders in an argument template
#[must_use]
pub fn fill_args(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            let mut filled = arg.clone();
            for (name, value) in vars {
                filled = filled.replace(&format!("{{{name}}}"), value);
            }
            filled
        })
        .collect()
}

/// Run a command to completion with a deadline, capturing output. The
/// child is killed if the deadline passes.
///
/// # Errors
///
/// Returns `Error::Timeout` when the deadline is exceeded and `Error::Io`
/// when the program cannot be spawned. A non-zero exit is NOT an error
/// here; callers inspect the status and map it to their own taxonomy.
pub async fn run_with_timeout(
    program: &str,
    args: &[String],
    stdin: Option<&[u8]>,
    stage: &'static str,
    deadline: Duration,
) -> Result<Output> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() {
            std::process::Stdio::piped()
        } else {
            std::process::Stdio::null()
        })
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!(program, ?args, stage, "running engine command");

    let mut child = command.spawn()?;

    if let Some(bytes) = stdin {
        use tokio::io::AsyncWriteExt;
        if let Some(mut handle) = child.stdin.take() {
            handle.write_all(bytes).await?;
            drop(handle); // close stdin so the engine sees EOF
        }
    }

    let output = tokio::time::timeout(deadline, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout {
            stage,
            seconds: deadline.as_secs(),
        })??;

    Ok(output)
}

/// Render stderr for diagnostics, trimmed
#[must_use]
pub fn stderr_snippet(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_placeholders() {
        let template = vec![
            "-v".to_string(),
            "{voice}".to_string(),
            "-w".to_string(),
            "{output}".to_string(),
        ];
        let filled = fill_args(&template, &[("voice", "hi"), ("output", "/tmp/out.wav")]);
        assert_eq!(filled, vec!["-v", "hi", "-w", "/tmp/out.wav"]);
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let template = vec!["{unmapped}".to_string()];
        let filled = fill_args(&template, &[("voice", "en")]);
        assert_eq!(filled, vec!["{unmapped}"]);
    }
}
