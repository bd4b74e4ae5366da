//! Still-image and audio capture.
//!
//! Capture calls block on the host for a long time, so they run on one
//! dedicated worker thread and never on the reactor or gateway.

pub mod media;
pub mod worker;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::host::HostError;

pub use media::Capturer;
pub use worker::CaptureWorker;

pub const DEFAULT_AUDIO_SECONDS: u32 = 30;
pub const AUDIO_SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureRequest {
    Screenshot,
    Photo { front_camera: bool },
    Audio { duration_seconds: u32 },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("audio encoding failed: {0}")]
    Audio(#[from] hound::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("capture discarded: service stopped")]
    Cancelled,
}
