//! Timelapse capture from a live stream
//!
//! The external tool is behind [`FrameCapture`]; [`FfmpegCapture`] is the
//! real one. The loop writes one `<epoch-seconds>.png` per iteration into the
//! output directory until its cancellation token fires.

use crate::client::EufyClient;
use crate::error::{EufyError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capture one still frame from a stream URL into a file
#[async_trait]
pub trait FrameCapture: Send + Sync {
    async fn capture(&self, url: &str, path: &Path) -> Result<()>;
}

/// Frame capture through the `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegCapture {
    pub binary: PathBuf,
    /// Output frame rate passed as `-r`
    pub frame_rate: u32,
    /// Per-frame limit; the process is killed when it runs out
    pub timeout: Duration,
}

impl Default for FfmpegCapture {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            frame_rate: 5,
            timeout: Duration::from_secs(20),
        }
    }
}

impl FfmpegCapture {
    fn args(&self, url: &str, path: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "panic".to_string(),
            "-i".to_string(),
            url.to_string(),
            "-r".to_string(),
            self.frame_rate.to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-y".to_string(),
            path.to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl FrameCapture for FfmpegCapture {
    async fn capture(&self, url: &str, path: &Path) -> Result<()> {
        // kill_on_drop reaps ffmpeg when the timeout (or a cancelled
        // timelapse) drops the child.
        let child = Command::new(&self.binary)
            .args(self.args(url, path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EufyError::Capture(format!("{} spawn failed: {}", self.binary.display(), e))
            })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(EufyError::Capture(format!(
                    "ffmpeg exited with {}: {}",
                    output.status,
                    stderr.trim()
                )))
            }
            Ok(Err(e)) => Err(EufyError::Capture(format!("ffmpeg execution failed: {}", e))),
            Err(_) => Err(EufyError::Capture(format!(
                "ffmpeg timeout ({}s)",
                self.timeout.as_secs()
            ))),
        }
    }
}

/// How the capture loop paces itself and when it gives up
#[derive(Debug, Clone)]
pub struct TimelapseOptions {
    /// Pause between frames
    pub interval: Duration,
    /// Abort after this many failed captures in a row; `None` keeps going
    pub max_consecutive_failures: Option<u32>,
}

impl Default for TimelapseOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_consecutive_failures: None,
        }
    }
}

/// Frame counts for a finished timelapse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelapseSummary {
    pub captured: u64,
    pub failed: u64,
}

/// Path for a frame taken at `epoch_secs`.
///
/// The first frame of a second gets `<secs>.png`; later ones in the same
/// second get `<secs>-1.png`, `<secs>-2.png`, ... so nothing is overwritten.
pub async fn next_frame_path(dir: &Path, epoch_secs: i64) -> Result<PathBuf> {
    let first = dir.join(format!("{}.png", epoch_secs));
    if !tokio::fs::try_exists(&first).await? {
        return Ok(first);
    }

    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}-{}.png", epoch_secs, n));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Sample `url` into `dir` until `cancel` fires.
///
/// Failed captures are logged and skipped unless
/// `options.max_consecutive_failures` is reached.
pub async fn run_timelapse(
    capture: &dyn FrameCapture,
    url: &str,
    dir: &Path,
    options: &TimelapseOptions,
    cancel: &CancellationToken,
) -> Result<TimelapseSummary> {
    tokio::fs::create_dir_all(dir).await?;

    let mut summary = TimelapseSummary::default();
    let mut consecutive_failures = 0u32;

    while !cancel.is_cancelled() {
        let path = next_frame_path(dir, Utc::now().timestamp()).await?;

        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            result = capture.capture(url, &path) => result,
        };

        match outcome {
            Ok(()) => {
                summary.captured += 1;
                consecutive_failures = 0;
                tracing::info!(frame = %path.display(), captured = summary.captured, "Captured frame");
            }
            Err(err) => {
                summary.failed += 1;
                consecutive_failures += 1;
                tracing::warn!(
                    error = %err,
                    consecutive_failures,
                    "Frame capture failed"
                );

                if let Some(max) = options.max_consecutive_failures {
                    if consecutive_failures >= max {
                        return Err(EufyError::Capture(format!(
                            "giving up after {} consecutive failures, last: {}",
                            consecutive_failures, err
                        )));
                    }
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(options.interval) => {}
        }
    }

    tracing::info!(
        captured = summary.captured,
        failed = summary.failed,
        "Timelapse stopped"
    );
    Ok(summary)
}

impl EufyClient {
    /// Start a stream for `device_name` and capture frames from it into
    /// `output_dir` until `cancel` fires. The stream is stopped on the way
    /// out; a failure to stop it is only logged.
    pub async fn timelapse(
        &self,
        device_name: &str,
        output_dir: &Path,
        capture: &dyn FrameCapture,
        options: &TimelapseOptions,
        cancel: &CancellationToken,
    ) -> Result<TimelapseSummary> {
        let stream = self.start_stream(device_name).await?;
        tracing::info!(device = %device_name, dir = %output_dir.display(), "Timelapse started");

        let result = run_timelapse(capture, &stream.url, output_dir, options, cancel).await;

        if let Err(err) = self.stop_stream(&stream).await {
            tracing::warn!(device = %device_name, error = %err, "Could not stop stream");
        }

        result
    }

    /// Run [`timelapse`](Self::timelapse) on its own task.
    ///
    /// Cancel the returned token to stop it; the handle yields the summary.
    pub fn spawn_timelapse(
        self: Arc<Self>,
        device_name: String,
        output_dir: PathBuf,
        capture: Arc<dyn FrameCapture>,
        options: TimelapseOptions,
    ) -> (JoinHandle<Result<TimelapseSummary>>, CancellationToken) {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            self.timelapse(
                &device_name,
                &output_dir,
                capture.as_ref(),
                &options,
                &task_cancel,
            )
            .await
        });

        (handle, cancel)
    }
}
