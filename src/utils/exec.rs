/// Spawning and awaiting the external tools in the pipeline.
///
/// Every invocation is an argv vector handed straight to the OS, never a
/// shell string, and is fully awaited before the caller proceeds.

use std::process::{ExitStatus, Stdio};
use anyhow::{anyhow, Result};
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

// Lines of stderr kept for the failure report.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChildStream {
    Stdout,
    Stderr,
}

/// Result of one awaited stage.
#[derive(Debug)]
pub struct StageOutput {
    pub tool: String,
    pub status: ExitStatus,
    pub stderr_tail: Vec<String>,
}

impl StageOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Reads one stream of a child line-by-line into a Vec.
pub async fn read_child_output_to_vec(
    child: &mut Child,
    stream: ChildStream,
) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    match stream {
        ChildStream::Stdout => {
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| anyhow!("Failed to get stdout from child"))?;
            let mut reader = BufReader::new(stdout).lines();
            while let Some(line) = reader.next_line().await? {
                lines.push(line);
            }
        }
        ChildStream::Stderr => {
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| anyhow!("Failed to get stderr from child"))?;
            let mut reader = BufReader::new(stderr).lines();
            while let Some(line) = reader.next_line().await? {
                lines.push(line);
            }
        }
    }
    Ok(lines)
}

fn drain_stream_task<R>(
    reader: R,
    tool: String,
    verbose: bool,
    keep_tail: bool,
) -> JoinHandle<Vec<String>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut tail: Vec<String> = Vec::new();
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if verbose {
                debug!("{}: {}", tool, line);
            }
            if keep_tail {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            }
        }
        tail
    })
}

/// Spawns one external tool, forwards its console chatter to the debug log,
/// and awaits its exit status. The last stderr lines are retained so a
/// failing stage can be reported with the tool's own diagnostics.
pub async fn run_stage(tool: &str, args: &[String], verbose: bool) -> Result<StageOutput> {
    debug!("Spawning: {} {}", tool, args.join(" "));

    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow!("Failed to spawn {}: {}. Is {} installed?", tool, e, tool))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("Failed to get stdout from {}", tool))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("Failed to get stderr from {}", tool))?;

    let stdout_task = drain_stream_task(stdout, tool.to_string(), verbose, false);
    let stderr_task = drain_stream_task(stderr, tool.to_string(), verbose, true);

    let status = child.wait().await?;
    stdout_task
        .await
        .map_err(|e| anyhow!("stdout reader for {} panicked: {}", tool, e))?;
    let stderr_tail = stderr_task
        .await
        .map_err(|e| anyhow!("stderr reader for {} panicked: {}", tool, e))?;

    Ok(StageOutput {
        tool: tool.to_string(),
        status,
        stderr_tail,
    })
}
