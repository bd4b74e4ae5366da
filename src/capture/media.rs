use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::{CaptureError, CaptureRequest, AUDIO_SAMPLE_RATE};
use crate::host::MediaSource;
use crate::kernel::time::Clock;

/// Turns host frames and sample chunks into files in the capture directory.
pub struct Capturer {
    media: Arc<dyn MediaSource>,
    clock: Arc<dyn Clock>,
    dir: PathBuf,
}

impl Capturer {
    pub fn new(media: Arc<dyn MediaSource>, clock: Arc<dyn Clock>, dir: PathBuf) -> Self {
        Self { media, clock, dir }
    }

    /// Runs one capture. `stop` is checked between large steps; a stopped
    /// capture removes whatever it had written.
    pub fn capture(&self, request: &CaptureRequest, stop: &CancellationToken) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.dir)?;
        match request {
            CaptureRequest::Screenshot => {
                let frame = self.media.screen_frame()?;
                self.write_image(frame, "screenshot", stop)
            }
            CaptureRequest::Photo { front_camera } => {
                let frame = self.media.camera_frame(*front_camera)?;
                self.write_image(frame, "photo", stop)
            }
            CaptureRequest::Audio { duration_seconds } => self.record_audio(*duration_seconds, stop),
        }
    }

    fn file_name(&self, prefix: &str, ext: &str) -> PathBuf {
        let id = Uuid::new_v4().simple().to_string();
        self.dir.join(format!("{}_{}_{}.{}", prefix, self.clock.now().as_i64(), &id[..8], ext))
    }

    fn write_image(&self, frame: image::DynamicImage, prefix: &str, stop: &CancellationToken) -> Result<PathBuf, CaptureError> {
        if stop.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }
        let path = self.file_name(prefix, "jpg");
        frame.save_with_format(&path, ImageFormat::Jpeg)?;
        info!("Captured {} -> {}", prefix, path.display());
        Ok(path)
    }

    fn record_audio(&self, duration_seconds: u32, stop: &CancellationToken) -> Result<PathBuf, CaptureError> {
        let path = self.file_name("audio", "wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: AUDIO_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;

        // One-second chunks; the stop signal is checked between them.
        for second in 0..duration_seconds {
            if stop.is_cancelled() {
                drop(writer);
                discard(&path);
                debug!("Audio capture stopped after {}s", second);
                return Err(CaptureError::Cancelled);
            }
            let chunk = match self.media.audio_chunk(AUDIO_SAMPLE_RATE, AUDIO_SAMPLE_RATE as usize) {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(writer);
                    discard(&path);
                    return Err(e.into());
                }
            };
            for sample in chunk {
                writer.write_sample(sample)?;
            }
        }

        writer.finalize()?;
        info!("Recorded {}s of audio -> {}", duration_seconds, path.display());
        Ok(path)
    }
}

pub(crate) fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!("Could not remove discarded capture {}: {}", path.display(), e);
    }
}
