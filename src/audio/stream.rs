//! Platform seam for audio capture.
//!
//! The negotiator and the sampling loop only see these traits; ALSA
//! implements them in `alsa_device`, tests implement them with fakes.

use anyhow::Result;

use crate::error::MeasureError;

/// Where the samples come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioSource {
    /// Unprocessed microphone path, bypassing any sound server conditioning
    RawUnprocessedMic,
    /// The system's regular microphone route
    StandardMic,
}

/// One capture configuration candidate. Always mono, signed 16-bit PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamConfig {
    pub source: AudioSource,
    pub sample_rate: u32,
}

impl AudioStreamConfig {
    pub const CHANNELS: u32 = 1;

    pub const fn new(source: AudioSource, sample_rate: u32) -> Self {
        Self {
            source,
            sample_rate,
        }
    }
}

/// Minimum buffer size reported by the platform for a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinBufferSize {
    /// Supported; `0` means the platform gave no usable minimum
    Frames(usize),
    /// The platform refuses this rate/format combination
    Unsupported,
}

/// Signal conditioning the platform may apply to a capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalEffect {
    AutomaticGainControl,
    NoiseSuppression,
    EchoCancellation,
}

impl SignalEffect {
    pub const ALL: [SignalEffect; 3] = [
        SignalEffect::AutomaticGainControl,
        SignalEffect::NoiseSuppression,
        SignalEffect::EchoCancellation,
    ];
}

/// Something that can open capture streams.
pub trait CapturePlatform {
    type Stream: CaptureStream;

    /// Query the minimum buffer for `config` without opening a stream.
    fn min_buffer_size(&self, config: &AudioStreamConfig) -> MinBufferSize;

    /// Open a capture stream. The result may still fail `is_initialized`.
    fn open(&self, config: &AudioStreamConfig, buffer_frames: usize) -> Result<Self::Stream>;
}

/// An open mono i16 capture stream, owned by exactly one sampling loop.
pub trait CaptureStream: Send {
    /// Whether the stream reached a usable state after opening.
    fn is_initialized(&self) -> bool;

    /// Block until samples are available and copy them into `buf`.
    ///
    /// `Ok(0)` and `Err(TransientReadFailure)` both mean "skip this tick";
    /// any other error ends the sampling loop.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, MeasureError>;

    fn effect_available(&self, effect: SignalEffect) -> bool;

    /// Turn an effect off. Callers ignore failures.
    fn disable_effect(&mut self, effect: SignalEffect) -> Result<()>;

    /// Stop and free the stream. Must be safe to call more than once and on
    /// a stream that never initialized.
    fn release(&mut self);
}
