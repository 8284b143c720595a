use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::controller::ScanController;
use super::loop_worker::capture_loop;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "bmp", "tiff"];

/// Supplies frames to the capture loop. `None` means the source is done.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Option<PathBuf>;
}

/// Frames recorded into a directory, played back in file-name order.
///
/// Images are frames; a `.json` recognition file with no image beside it is
/// a frame of its own.
pub struct DirectoryFrameSource {
    frames: std::vec::IntoIter<PathBuf>,
}

impl DirectoryFrameSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut frames = Vec::new();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("failed to read frame directory {}", dir.display()))?
        {
            let path = entry?.path();
            if is_frame(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(Self::from_frames(frames))
    }

    pub fn from_frames(frames: Vec<PathBuf>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Frames that are real images, as opposed to recognition files.
pub(crate) fn is_image_frame(path: &Path) -> bool {
    extension(path).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn is_frame(path: &Path) -> bool {
    match extension(path).as_deref() {
        Some("json") => !IMAGE_EXTENSIONS
            .iter()
            .any(|ext| path.with_extension(ext).exists()),
        Some(_) => is_image_frame(path),
        None => false,
    }
}

impl FrameSource for DirectoryFrameSource {
    fn next_frame(&mut self) -> Option<PathBuf> {
        self.frames.next()
    }
}

/// Owns the background capture loop of a live scan.
pub struct CaptureController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for CaptureController {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn start(
        &mut self,
        controller: ScanController,
        source: Box<dyn FrameSource>,
        interval: Duration,
    ) -> Result<()> {
        if self.is_running() {
            bail!("capture already running");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            controller,
            source,
            interval,
            cancel_token.clone(),
        ));

        info!("Capture loop started ({}ms interval)", interval.as_millis());
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancel the loop and wait for its in-flight frames to settle.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.join().await
    }

    /// Wait for the loop to end on its own (source exhausted).
    pub async fn wait(&mut self) -> Result<()> {
        self.join().await?;
        self.cancel_token = None;
        Ok(())
    }

    // The handle is only released once the loop has ended, so a dropped
    // wait leaves it in place for a later stop.
    async fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };
        let joined = handle.await;
        self.handle = None;
        joined.context("capture loop task failed to join")
    }
}
