//! Async frame loop

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use site_monitor::{FrameInput, SiteMonitor};

use crate::{ApiError, SharedState};

/// Totals for one run over a feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub frames: u64,
    pub alerts: u64,
    /// Lines that failed to parse and were skipped
    pub skipped_lines: u64,
    /// Stopped by the shutdown signal rather than end of feed
    pub interrupted: bool,
}

/// Feed every frame from `reader` through the monitor until the feed ends or
/// `shutdown` resolves. Shared API state is refreshed after each frame.
pub async fn run_feed<R>(
    reader: R,
    monitor: &mut SiteMonitor,
    state: SharedState,
    shutdown: impl Future<Output = ()>,
) -> Result<FeedSummary, ApiError>
where
    R: AsyncBufRead + Unpin,
{
    let alerts = state.read().await.alerts.clone();
    state.write().await.running = true;

    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut summary = FeedSummary::default();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping frame loop");
                summary.interrupted = true;
                break;
            }
        };
        let Some(line) = line? else {
            info!("Frame feed ended after {} lines", line_no);
            break;
        };
        line_no += 1;

        let input = match FrameInput::parse_line(&line, line_no) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping frame: {}", e);
                summary.skipped_lines += 1;
                continue;
            }
        };

        let report = monitor.process_frame(&input, &*alerts);
        summary.frames += 1;
        summary.alerts += report.alerts.len() as u64;

        let mut shared = state.write().await;
        shared.frames_processed = monitor.frames_processed();
        shared.headcount = Some(monitor.headcount_stats());
    }

    state.write().await.running = false;
    info!(
        "Frame loop done: {} frames, {} alerts, {} skipped lines",
        summary.frames, summary.alerts, summary.skipped_lines
    );
    Ok(summary)
}
