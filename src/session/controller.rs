use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::capture::{is_image_frame, CaptureController, FrameSource};
use super::pipeline::{analyze_frame, parse_page, recognize_frame};
use super::state::{PendingPage, SessionSnapshot, SessionState};
use crate::db::Database;
use crate::export::{render_recipe, ExportFormat, Exporter, ShareTarget};
use crate::models::{Page, Scan, ScanListItem, ScanMetadata, ScanStatus};
use crate::ocr::TextRecognizer;
use crate::settings::SettingsStore;
use crate::storage::ImageStore;
use crate::utils::validation::validate_scan_name;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Timer jitter tolerated by the processing throttle.
const THROTTLE_SLACK: Duration = Duration::from_millis(100);

/// What happened to one submitted frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum FrameOutcome {
    /// No scan is active.
    Inactive,
    /// Another frame is still being recognized.
    Busy,
    /// Arrived sooner than the processing interval allows.
    Throttled,
    RecognitionFailed,
    /// Nothing meaningful survived filtering.
    NoText,
    /// The session moved on while the frame was being recognized.
    Discarded,
    #[serde(rename_all = "camelCase")]
    Processed {
        page_turn: bool,
        page_number: u32,
        similarity: Option<f64>,
        /// Id of the page committed because of this frame's page turn.
        committed: Option<String>,
    },
}

/// Drives one scan session at a time: frame processing, page commits and the
/// scan lifecycle, plus the stored-scan operations around it.
#[derive(Clone)]
pub struct ScanController {
    state: Arc<Mutex<SessionState>>,
    db: Database,
    recognizer: Arc<dyn TextRecognizer>,
    settings: Arc<SettingsStore>,
    images: ImageStore,
    exporter: Arc<Exporter>,
    capture: Arc<Mutex<CaptureController>>,
}

impl ScanController {
    pub fn new(
        db: Database,
        recognizer: Arc<dyn TextRecognizer>,
        settings: Arc<SettingsStore>,
        images: ImageStore,
        exporter: Exporter,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            db,
            recognizer,
            settings,
            images,
            exporter: Arc::new(exporter),
            capture: Arc::new(Mutex::new(CaptureController::new())),
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot::from_state(&state)
    }

    pub async fn start_scan(&self, name: &str, metadata: ScanMetadata) -> Result<Scan> {
        validate_scan_name(name)?;

        let mut state = self.state.lock().await;
        if let Some(open) = &state.scan {
            bail!(
                "scan \"{}\" is still {}; stop it before starting another",
                open.name,
                open.status.as_str()
            );
        }

        let scan = Scan::new(name, metadata, Utc::now());
        self.db.insert_scan(&scan).await?;

        let threshold = self.settings.capture().page_turn_threshold;
        state.begin(scan.clone(), threshold);

        log_info!("Started scan {} ({})", scan.name, scan.id);
        Ok(scan)
    }

    /// Pause the live scan. With auto-save on, the page in progress is
    /// committed first.
    pub async fn pause_scan(&self) -> Result<Scan> {
        let mut state = self.state.lock().await;
        if !state.is_active() {
            bail!("no active scan to pause");
        }

        self.flush_pending(&mut state).await?;

        let now = Utc::now();
        let mut scan = state
            .scan
            .clone()
            .ok_or_else(|| anyhow!("no active scan to pause"))?;
        scan.transition(ScanStatus::Paused, now)?;
        self.db
            .update_scan_status(&scan.id, scan.status, scan.current_page, now)
            .await?;

        let threshold = state.tracker.page_turns.threshold();
        state.reset_live(threshold, scan.current_page);
        state.scan = Some(scan.clone());

        log_info!("Paused scan {} at page {}", scan.id, scan.current_page);
        Ok(scan)
    }

    /// Resume a paused scan, either the one still open in this session or
    /// one loaded from the database.
    pub async fn resume_scan(&self, scan_id: &str) -> Result<Scan> {
        let mut state = self.state.lock().await;
        let mut scan = match &state.scan {
            Some(open) if open.id != scan_id => {
                bail!("scan \"{}\" is still open; stop it first", open.name)
            }
            Some(open) => open.clone(),
            None => self
                .db
                .get_scan(scan_id)
                .await?
                .ok_or_else(|| anyhow!("scan {scan_id} not found"))?,
        };

        let now = Utc::now();
        scan.transition(ScanStatus::Active, now)?;
        self.db
            .update_scan_status(&scan.id, scan.status, scan.current_page, now)
            .await?;

        let threshold = self.settings.capture().page_turn_threshold;
        state.begin(scan.clone(), threshold);

        log_info!("Resumed scan {} at page {}", scan.id, scan.current_page);
        Ok(scan)
    }

    /// Complete the open scan. In-flight recognition is cancelled and capture
    /// stopped before the final commit, so no frame lands after it.
    pub async fn stop_scan(&self) -> Result<Scan> {
        {
            let mut state = self.state.lock().await;
            if state.scan.is_none() {
                bail!("no scan to stop");
            }
            state.closing = true;
            state.invalidate_in_flight();
        }
        self.halt_capture().await?;

        let mut state = self.state.lock().await;
        let completed = self.complete_open_scan(&mut state).await;
        if completed.is_err() {
            state.closing = false;
        }
        completed
    }

    async fn complete_open_scan(&self, state: &mut SessionState) -> Result<Scan> {
        if state.scan.is_none() {
            bail!("no scan to stop");
        }

        self.flush_pending(state).await?;

        let now = Utc::now();
        let mut scan = state.scan.clone().ok_or_else(|| anyhow!("no scan to stop"))?;
        scan.transition(ScanStatus::Completed, now)?;
        self.db
            .update_scan_status(&scan.id, scan.status, scan.current_page, now)
            .await?;

        state.clear();

        log_info!(
            "Completed scan {} with {} page(s)",
            scan.id,
            scan.total_pages
        );
        Ok(scan)
    }

    /// Join the capture loop once the session is closing. Recognition was
    /// cancelled beforehand, so the join never waits on the recognizer.
    async fn halt_capture(&self) -> Result<()> {
        if let Err(err) = self.stop_capture().await {
            self.state.lock().await.closing = false;
            return Err(err);
        }
        Ok(())
    }

    /// Run one frame through the pipeline.
    ///
    /// The session lock is released while the recognizer runs; a frame whose
    /// session was paused, stopped or advanced in the meantime is discarded.
    pub async fn process_frame(&self, frame: &Path) -> Result<FrameOutcome> {
        let capture = self.settings.capture();

        let (generation, cancel_token) = {
            let mut state = self.state.lock().await;
            if !state.accepts_frames() {
                return Ok(FrameOutcome::Inactive);
            }
            if state.in_flight {
                return Ok(FrameOutcome::Busy);
            }
            if let Some(last) = state.last_processed_at {
                if last.elapsed() + THROTTLE_SLACK < capture.processing_interval() {
                    return Ok(FrameOutcome::Throttled);
                }
            }
            state.in_flight = true;
            state.last_processed_at = Some(Instant::now());
            (state.generation, state.cancel_token.clone())
        };

        let started = Instant::now();
        let recognized = recognize_frame(
            Arc::clone(&self.recognizer),
            frame.to_path_buf(),
            capture.recognition_timeout(),
            cancel_token,
        )
        .await;
        let recognition_ms = started.elapsed().as_millis();

        let mut state = self.state.lock().await;
        if state.generation != generation {
            log_debug!("Dropping result for {}: session moved on", frame.display());
            return Ok(FrameOutcome::Discarded);
        }
        state.in_flight = false;

        let recognized = match recognized {
            None => return Ok(FrameOutcome::Discarded),
            Some(Err(err)) => {
                log_warn!("Recognition failed for {}: {err}", frame.display());
                return Ok(FrameOutcome::RecognitionFailed);
            }
            Some(Ok(recognized)) => recognized,
        };

        let pipeline_started = Instant::now();
        let Some(analysis) = analyze_frame(&mut state.tracker, &recognized) else {
            log_debug!("No meaningful text in {}", frame.display());
            return Ok(FrameOutcome::NoText);
        };

        if let Some(similarity) = analysis.turn.similarity {
            log_debug!(
                "Frame similarity {:.3} (turn: {})",
                similarity,
                analysis.turn.is_turn
            );
        }

        let mut committed = None;
        if analysis.turn.is_turn {
            if let Some(pending) = state.current_page.take() {
                if self.settings.get().auto_save_enabled {
                    let next_page = state.tracker.current_page_number();
                    match self.commit_page(&mut state, pending, next_page).await {
                        Ok(page_id) => committed = Some(page_id),
                        Err(err) => log_error!("Failed to save page on turn: {err:#}"),
                    }
                } else {
                    log_debug!("Page turn without auto-save; previous page dropped");
                }
            }
        }

        let scan_id = state
            .scan
            .as_ref()
            .map(|scan| scan.id.clone())
            .ok_or_else(|| anyhow!("live scan disappeared mid-frame"))?;
        let page_number = state.tracker.current_page_number();
        let detected = analysis.page_number.is_some();

        match state.current_page.as_mut() {
            Some(pending) => {
                pending.page.set_fragments(analysis.lines);
                pending.frame = frame.to_path_buf();
                if detected {
                    pending.page.page_number = page_number;
                }
            }
            None => {
                let mut page = Page::new(&scan_id, page_number, Utc::now());
                page.set_fragments(analysis.lines);
                state.current_page = Some(PendingPage {
                    page,
                    frame: frame.to_path_buf(),
                });
            }
        }

        log_info!(
            "Frame {} -> page {} (recognition {}ms, pipeline {}ms)",
            frame.display(),
            page_number,
            recognition_ms,
            pipeline_started.elapsed().as_millis()
        );

        Ok(FrameOutcome::Processed {
            page_turn: analysis.turn.is_turn,
            page_number,
            similarity: analysis.turn.similarity,
            committed,
        })
    }

    /// Save the page in progress now, whatever the page-turn detector says,
    /// and start the next page. Returns the committed page id, if any.
    pub async fn next_page(&self) -> Result<Option<String>> {
        let mut state = self.state.lock().await;
        if !state.is_active() {
            bail!("no active scan");
        }

        let Some(pending) = state.current_page.clone() else {
            return Ok(None);
        };
        let next_page = pending.page.page_number.saturating_add(1);
        let page_id = self.commit_page(&mut state, pending, next_page).await?;

        let threshold = state.tracker.page_turns.threshold();
        state.reset_live(threshold, next_page);
        Ok(Some(page_id))
    }

    /// Commit the page in progress when auto-save is on; drop it otherwise.
    async fn flush_pending(&self, state: &mut SessionState) -> Result<()> {
        let Some(pending) = state.current_page.clone() else {
            return Ok(());
        };

        if self.settings.get().auto_save_enabled && pending.page.has_content() {
            let next_page = pending.page.page_number.saturating_add(1);
            self.commit_page(state, pending, next_page).await?;
        }
        state.current_page = None;
        Ok(())
    }

    /// Parse, render and durably store a page, then append it to the live
    /// scan. The in-memory scan is untouched if the write fails.
    async fn commit_page(
        &self,
        state: &mut SessionState,
        pending: PendingPage,
        next_page: u32,
    ) -> Result<String> {
        let PendingPage { mut page, frame } = pending;

        if let Some(mut recipe) = parse_page(&page) {
            recipe.raw_markdown = render_recipe(&recipe);
            log_info!("Found recipe \"{}\" on page {}", recipe.title, page.page_number);
            page.recipes = vec![recipe];
        }

        let mut stored_image = None;
        if self.settings.get().keep_page_images && is_image_frame(&frame) {
            match self.images.save_page_image(&page.scan_id, &page.id, &frame) {
                Ok(path) => {
                    page.image_path = Some(path.to_string_lossy().into_owned());
                    stored_image = Some(path);
                }
                Err(err) => log_warn!("Keeping page {} without its image: {err:#}", page.id),
            }
        }

        let now = Utc::now();
        if let Err(err) = self.db.commit_page(&page, next_page, now).await {
            if let Some(path) = stored_image {
                let _ = fs::remove_file(path);
            }
            return Err(err.context(format!("failed to commit page {}", page.page_number)));
        }

        let scan = state
            .scan
            .as_mut()
            .ok_or_else(|| anyhow!("page committed without a live scan"))?;
        let page_id = page.id.clone();
        log_info!(
            "Committed page {} ({} recipe(s)) to scan {}",
            page.page_number,
            page.recipes.len(),
            scan.id
        );
        scan.current_page = next_page;
        scan.push_page(page, now);
        state.current_page = None;

        Ok(page_id)
    }

    pub async fn list_scans(&self) -> Result<Vec<ScanListItem>> {
        self.db.list_scan_items().await
    }

    /// The open scan from memory, anything else from the database.
    pub async fn get_scan(&self, scan_id: &str) -> Result<Option<Scan>> {
        {
            let state = self.state.lock().await;
            if let Some(open) = state.scan.as_ref().filter(|scan| scan.id == scan_id) {
                return Ok(Some(open.clone()));
            }
        }
        self.db.get_scan(scan_id).await
    }

    /// Delete a scan with its pages, recipes and images. Deleting the open
    /// scan ends the session.
    pub async fn delete_scan(&self, scan_id: &str) -> Result<bool> {
        let is_open = {
            let mut state = self.state.lock().await;
            let is_open = state.scan.as_ref().is_some_and(|scan| scan.id == scan_id);
            if is_open {
                state.closing = true;
                state.invalidate_in_flight();
            }
            is_open
        };
        if is_open {
            self.halt_capture().await?;
            self.state.lock().await.clear();
        }

        let deleted = self.db.delete_scan(scan_id).await?;
        self.images.delete_scan_images(scan_id)?;
        if deleted {
            log_info!("Deleted scan {scan_id}");
        }
        Ok(deleted)
    }

    /// Export a scan in `format`, or the configured format when `None`.
    pub async fn export_scan(&self, scan_id: &str, format: Option<ExportFormat>) -> Result<PathBuf> {
        let scan = self.require_scan(scan_id).await?;
        let format = format.unwrap_or(self.settings.get().export_format);
        let path = self
            .exporter
            .export(&scan, format)
            .with_context(|| format!("failed to export scan {scan_id}"))?;
        log_info!("Exported scan {} to {}", scan_id, path.display());
        Ok(path)
    }

    pub async fn export_and_share(
        &self,
        scan_id: &str,
        format: Option<ExportFormat>,
        target: &dyn ShareTarget,
    ) -> Result<PathBuf> {
        let scan = self.require_scan(scan_id).await?;
        let format = format.unwrap_or(self.settings.get().export_format);
        let path = self
            .exporter
            .export_and_share(&scan, format, target)
            .with_context(|| format!("failed to share scan {scan_id}"))?;
        Ok(path)
    }

    pub fn list_exports(&self) -> Result<Vec<PathBuf>> {
        Ok(self.exporter.list_exports()?)
    }

    async fn require_scan(&self, scan_id: &str) -> Result<Scan> {
        self.get_scan(scan_id)
            .await?
            .ok_or_else(|| anyhow!("scan {scan_id} not found"))
    }

    /// Scans left active by a crashed process come back paused.
    pub async fn recover(&self) -> Result<Vec<String>> {
        let recovered = self.db.recover_interrupted_scans(Utc::now()).await?;
        if !recovered.is_empty() {
            log_warn!("Recovered {} interrupted scan(s)", recovered.len());
        }
        Ok(recovered)
    }

    pub async fn start_capture(&self, source: Box<dyn FrameSource>) -> Result<()> {
        if !self.state.lock().await.is_active() {
            bail!("no active scan to capture into");
        }
        let interval = self.settings.capture().interval();
        self.capture
            .lock()
            .await
            .start(self.clone(), source, interval)
    }

    pub async fn stop_capture(&self) -> Result<()> {
        self.capture.lock().await.stop().await
    }

    /// Block until the frame source runs dry.
    pub async fn wait_for_capture(&self) -> Result<()> {
        self.capture.lock().await.wait().await
    }
}
