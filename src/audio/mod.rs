//! audio - Microphone capture and sound level estimation
//!
//! Negotiates an ALSA capture stream from a fixed preference list, switches
//! off driver-side conditioning where the mixer exposes it, and turns PCM
//! blocks into a smoothed, bounded decibel estimate on a dedicated thread.

mod alsa_device;
mod capture;
mod level;
pub(crate) mod negotiator;
mod stream;

pub use alsa_device::AlsaPlatform;
pub use capture::{CaptureSession, LevelSink};
pub use level::LevelParams;
pub use stream::CapturePlatform;
