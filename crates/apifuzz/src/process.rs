use std::{io, path::Path, process::Stdio};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};
use tracing::{error, info};

use crate::DriverError;

/// Captured result of one external-tool invocation. Fully drained to disk
/// by [`run_tool`] before it is returned.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

async fn drain<R>(mut reader: R) -> Result<Vec<u8>, io::Error>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    Ok(buffer)
}

/// Launch one external tool in `working_dir`, buffer both standard streams
/// until it exits, and persist them to `<tool>.stdout.txt` /
/// `<tool>.stderr.txt` for postmortem inspection.
///
/// This is the sole primitive used to invoke the compiler, the engine, and
/// the results analyzer. There is deliberately no timeout: the tool governs
/// its own lifetime. A nonzero exit code is logged but is not an error
/// here; treating it as fatal is the caller's call.
pub async fn run_tool(
    tool: &'static str,
    binary: &Path,
    args: &[String],
    working_dir: &Path,
) -> Result<ProcessResult, DriverError> {
    info!(tool, binary = %binary.display(), "launching external tool");

    let mut command = Command::new(binary);
    command
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DriverError::MissingTool {
                tool,
                binary: binary.to_path_buf(),
            }
        } else {
            DriverError::Spawn {
                binary: binary.to_path_buf(),
                source,
            }
        }
    })?;

    let stdout = child.stdout.take().ok_or(DriverError::MissingStdout)?;
    let stderr = child.stderr.take().ok_or(DriverError::MissingStderr)?;

    let stdout_task = tokio::spawn(drain(stdout));
    let stderr_task = tokio::spawn(drain(stderr));

    let status = child.wait().await.map_err(DriverError::Wait)?;

    let stdout = stdout_task
        .await
        .map_err(|e| DriverError::Join(e.to_string()))?
        .map_err(DriverError::StdoutRead)?;
    let stderr = stderr_task
        .await
        .map_err(|e| DriverError::Join(e.to_string()))?
        .map_err(DriverError::StderrRead)?;

    persist(working_dir, tool, "stdout", &stdout)?;
    persist(working_dir, tool, "stderr", &stderr)?;

    let exit_code = status.code().unwrap_or(1);
    if exit_code != 0 {
        error!(tool, exit_code, "external tool exited with a failure status");
    }

    Ok(ProcessResult {
        exit_code,
        stdout,
        stderr,
    })
}

fn persist(dir: &Path, tool: &str, stream: &str, bytes: &[u8]) -> Result<(), DriverError> {
    let path = dir.join(format!("{tool}.{stream}.txt"));
    std::fs::write(&path, bytes).map_err(|source| DriverError::Write { path, source })
}
