//! Error taxonomy for the measurement pipeline.
//!
//! None of these are fatal to the process: each one degrades a single
//! measurement channel and leaves the other running.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    /// Pressure outside the domain of the barometric formula
    #[error("Invalid pressure sample: {0} hPa")]
    InvalidSample(f32),

    /// Every capture configuration failed to initialize
    #[error("No usable audio capture device")]
    NoUsableAudioDevice,

    /// A single read produced no samples; the sampling loop skips the tick
    #[error("Transient audio read failure")]
    TransientReadFailure,

    /// The capture stream is unusable and the sampling loop must end
    #[error("Audio device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, MeasureError>;
