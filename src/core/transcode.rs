//! External transcoder invocation.
//!
//! Writes run through ffmpeg with a fixed argument contract: seek to the
//! window start, bound the duration, force mono 16 kHz MP3 (tuned for the
//! downstream speech-to-text model) and overwrite the output path. One
//! invocation is bounded by a wall-clock timeout and a combined
//! stdout+stderr buffer cap; exceeding either fails the request instead of
//! hanging it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::request::ClipWindow;
use crate::errors::pipeline_error::{PipelineError, PipelineResult};

/// Combined stdout/stderr cap for one subprocess invocation.
pub const MAX_SUBPROCESS_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg_path: PathBuf,
    timeout: Duration,
    output_cap: usize,
}

impl Transcoder {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
            output_cap: MAX_SUBPROCESS_OUTPUT_BYTES,
        }
    }

    pub fn with_output_cap(mut self, cap: usize) -> Self {
        self.output_cap = cap;
        self
    }

    /// Fail fast when the configured binary is not reachable/executable.
    /// Bare names are resolved against `PATH`.
    pub fn verify_binary(&self) -> PipelineResult<PathBuf> {
        resolve_binary(&self.ffmpeg_path)
            .ok_or_else(|| PipelineError::BinaryNotFound(self.ffmpeg_path.display().to_string()))
    }

    /// Trim `input` to `window` and re-encode it into `output`.
    pub async fn trim(
        &self,
        input: &Path,
        window: ClipWindow,
        output: &Path,
    ) -> PipelineResult<()> {
        let binary = self.verify_binary()?;
        let args = build_args(input, window, output);

        tracing::debug!(
            binary = %binary.display(),
            from_time = window.from_time,
            to_time = window.to_time,
            duration = window.duration(),
            "invoking transcoder"
        );

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PipelineError::Transcode(format!("failed to spawn {}: {e}", binary.display()))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Transcode("subprocess stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PipelineError::Transcode("subprocess stderr unavailable".into()))?;

        let cap = self.output_cap;
        let run = async {
            let (out, err) = tokio::join!(read_capped(stdout, cap), read_capped(stderr, cap));
            let out = out
                .map_err(|e| PipelineError::Transcode(format!("failed to read stdout: {e}")))?;
            let err = err
                .map_err(|e| PipelineError::Transcode(format!("failed to read stderr: {e}")))?;
            if out.len() + err.len() > cap {
                let _ = child.start_kill();
                return Err(PipelineError::Transcode(format!(
                    "subprocess output exceeded the {cap} byte buffer limit"
                )));
            }
            let status = child
                .wait()
                .await
                .map_err(|e| PipelineError::Transcode(format!("failed to await subprocess: {e}")))?;
            Ok((status, err))
        };

        // Bind before matching so the in-flight future (and its borrow of
        // `child`) is dropped before the timeout arm kills the process.
        let outcome = timeout(self.timeout, run).await;
        match outcome {
            Ok(Ok((status, _))) if status.success() => Ok(()),
            Ok(Ok((status, stderr))) => {
                let stderr_tail = tail_utf8(&stderr, 2048);
                tracing::error!("FFmpeg stderr: {stderr_tail}");
                Err(PipelineError::Transcode(format!(
                    "{status}: {stderr_tail}"
                )))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let _ = child.start_kill();
                Err(PipelineError::Transcode(format!(
                    "timed out after {:.0}s",
                    self.timeout.as_secs_f64()
                )))
            }
        }
    }
}

/// Read at most `cap + 1` bytes so the caller can distinguish "fits" from
/// "exceeded" without buffering unbounded subprocess output.
async fn read_capped<R>(reader: R, cap: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut limited = reader.take(cap as u64 + 1);
    limited.read_to_end(&mut buffer).await?;
    Ok(buffer)
}

/// Fixed argument contract for one trim/re-encode invocation.
pub fn build_args(input: &Path, window: ClipWindow, output: &Path) -> Vec<OsString> {
    vec![
        OsString::from("-i"),
        input.as_os_str().to_os_string(),
        OsString::from("-ss"),
        OsString::from(fmt_seconds(window.from_time)),
        OsString::from("-t"),
        OsString::from(fmt_seconds(window.duration())),
        OsString::from("-c:a"),
        OsString::from("mp3"),
        OsString::from("-b:a"),
        OsString::from("128k"),
        // 16 kHz mono is what the transcription model expects.
        OsString::from("-ar"),
        OsString::from("16000"),
        OsString::from("-ac"),
        OsString::from("1"),
        OsString::from("-f"),
        OsString::from("mp3"),
        OsString::from("-y"),
        output.as_os_str().to_os_string(),
    ]
}

/// Read the finished output artifact, rejecting a missing or empty file even
/// when the subprocess reported success (defends against silent no-op
/// encodes).
pub async fn read_output(path: &Path) -> PipelineResult<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(PipelineError::Transcode(
            "output file is missing or empty".to_string(),
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PipelineError::Transcode(
            "output file is missing or empty".to_string(),
        )),
        Err(e) => Err(PipelineError::Transcode(format!(
            "failed to read output file: {e}"
        ))),
    }
}

/// Best-effort container analysis of the input artifact. Logged only; a
/// probe failure never fails the request.
pub async fn probe_format(ffprobe_path: &Path, input: &Path) {
    let Some(binary) = resolve_binary(ffprobe_path) else {
        tracing::debug!(path = %ffprobe_path.display(), "ffprobe not available, skipping analysis");
        return;
    };

    let result = timeout(
        Duration::from_secs(10),
        Command::new(&binary)
            .args(["-v", "error", "-show_format", "-of", "json"])
            .arg(input)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output(),
    )
    .await;

    match result {
        Ok(Ok(output)) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout);
            tracing::debug!("audio analysis: {}", text.trim());
        }
        Ok(Ok(output)) => {
            tracing::warn!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(Err(e)) => tracing::warn!("ffprobe failed to run: {e}"),
        Err(_) => tracing::warn!("ffprobe timed out"),
    }
}

fn fmt_seconds(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn tail_utf8(bytes: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    match trimmed.char_indices().nth_back(max.saturating_sub(1)) {
        Some((idx, _)) => trimmed[idx..].to_string(),
        None => trimmed.to_string(),
    }
}

fn resolve_binary(path: &Path) -> Option<PathBuf> {
    if path.components().count() > 1 {
        return is_executable_file(path).then(|| path.to_path_buf());
    }
    let dirs = std::env::var_os("PATH")?;
    std::env::split_paths(&dirs)
        .map(|dir| dir.join(path))
        .find(|candidate| is_executable_file(candidate))
}

fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
