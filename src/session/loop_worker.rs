use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::capture::FrameSource;
use super::controller::{FrameOutcome, ScanController};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Pull a frame every `interval` and hand it to the scan controller.
///
/// Each frame is processed on its own task so the ticker keeps running while
/// recognition is in flight; frames that land while the controller is busy
/// are dropped by the controller, not queued here.
pub async fn capture_loop(
    controller: ScanController,
    mut source: Box<dyn FrameSource>,
    interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                in_flight.retain(|handle| !handle.is_finished());

                let Some(frame) = source.next_frame() else {
                    log_info!("frame source exhausted");
                    break;
                };

                let controller = controller.clone();
                in_flight.push(tokio::spawn(async move {
                    match controller.process_frame(&frame).await {
                        Ok(FrameOutcome::Processed { page_number, page_turn, .. }) => {
                            log_debug!("frame {} processed (page {page_number}, turn={page_turn})", frame.display());
                        }
                        Ok(outcome) => {
                            log_debug!("frame {} skipped: {outcome:?}", frame.display());
                        }
                        Err(err) => {
                            log_error!("frame {} failed: {err:#}", frame.display());
                        }
                    }
                }));
            }
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down");
                break;
            }
        }
    }

    // Cancelled frames finish quickly: the session discards their results.
    for handle in in_flight {
        if let Err(err) = handle.await {
            log_error!("frame task failed to join: {err}");
        }
    }
}
