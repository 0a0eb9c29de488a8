//! External tool runner

use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use super::types::ToolError;

/// Run `command` to completion, killing it once `timeout` expires.
///
/// The child is spawned with `kill_on_drop`, so dropping the returned future
/// (timeout or client disconnect) also terminates the process.
pub(crate) async fn run_tool(
    mut command: Command,
    timeout: Duration,
) -> Result<Output, ToolError> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| ToolError::Spawn {
        program: program.clone(),
        source,
    })?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.map_err(|source| ToolError::Io { program, source }),
        Err(_) => Err(ToolError::TimedOut { program, timeout }),
    }
}
