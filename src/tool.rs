use std::process::{Output, Stdio};

use tokio::process::Command;
use tracing::debug;

/// Lines of stderr kept when a tool fails.
const STDERR_TAIL_LINES: usize = 20;

/// Check that `bin` can be launched with `version_arg`.
pub async fn check_tool(bin: &str, version_arg: &str) -> std::result::Result<(), String> {
    let output = Command::new(bin)
        .arg(version_arg)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            format!("{bin} not found. Please install it and ensure it's in your PATH. Error: {e}")
        })?;

    if !output.status.success() {
        return Err(format!("{bin} check failed: {}", stderr_tail(&output)));
    }

    debug!("{} is available", bin);
    Ok(())
}

/// Run a tool to completion, capturing its output.
///
/// A spawn failure or a non-zero exit becomes an error message that carries
/// the tail of the tool's stderr.
pub async fn run_tool(name: &str, command: &mut Command) -> std::result::Result<Output, String> {
    debug!("Running {}: {:?}", name, command.as_std());

    // Own process group, so a terminal Ctrl-C reaches only us and the tool finishes its run.
    #[cfg(unix)]
    command.process_group(0);

    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| format!("Failed to run {name}: {e}"))?;

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        return Err(format!(
            "{name} exited with status {code}: {}",
            stderr_tail(&output)
        ));
    }

    Ok(output)
}

/// Last lines of stderr, where tools put their diagnostics and tracebacks.
pub fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "(no diagnostic output)".to_string()
    } else {
        tail
    }
}
