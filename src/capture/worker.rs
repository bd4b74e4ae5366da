use std::path::PathBuf;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::media::{discard, Capturer};
use super::{CaptureError, CaptureRequest};

struct CaptureJob {
    request: CaptureRequest,
    stop: CancellationToken,
    reply: oneshot::Sender<Option<PathBuf>>,
}

/// Single-threaded executor for capture jobs. Jobs run one at a time in
/// submission order. A job whose stop token fires before it finishes
/// replies `None` and leaves no file behind.
pub struct CaptureWorker {
    tx: mpsc::UnboundedSender<CaptureJob>,
    _thread: JoinHandle<()>,
}

impl CaptureWorker {
    pub fn spawn(capturer: Capturer) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<CaptureJob>();

        // Dedicated OS thread: host capture calls block.
        let thread = std::thread::Builder::new()
            .name("hostwatch-capture".to_string())
            .spawn(move || {
                info!("Capture worker started");
                while let Some(job) = rx.blocking_recv() {
                    let outcome = run_job(&capturer, &job.request, &job.stop);
                    // Receiver may have gone away; the result is simply dropped.
                    let _ = job.reply.send(outcome);
                }
                info!("Capture worker exiting");
            })?;

        Ok(Self { tx, _thread: thread })
    }

    /// Queues a capture. The receiver yields `None` on any failure.
    pub fn submit(&self, request: CaptureRequest, stop: CancellationToken) -> oneshot::Receiver<Option<PathBuf>> {
        let (reply, rx) = oneshot::channel();
        if let Err(e) = self.tx.send(CaptureJob { request, stop, reply }) {
            // Worker gone: dropping the job drops its reply sender, so the
            // caller observes a closed channel.
            warn!("Capture worker unavailable: {:?}", e.0.request);
        }
        rx
    }
}

fn run_job(capturer: &Capturer, request: &CaptureRequest, stop: &CancellationToken) -> Option<PathBuf> {
    if stop.is_cancelled() {
        return None;
    }
    match capturer.capture(request, stop) {
        // A stop that landed during the last step still discards the result.
        Ok(path) if stop.is_cancelled() => {
            discard(&path);
            None
        }
        Ok(path) => Some(path),
        Err(CaptureError::Cancelled) => None,
        Err(e) => {
            warn!("Capture {:?} failed: {}", request, e);
            None
        }
    }
}
