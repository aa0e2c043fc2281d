//! Picks the first capture configuration the platform can actually open.

use super::stream::{
    AudioSource, AudioStreamConfig, CapturePlatform, CaptureStream, MinBufferSize, SignalEffect,
};
use crate::error::{MeasureError, Result};

/// Preference order: unprocessed mic first, then the regular route at 48k and 44.1k.
pub const PREFERRED_CONFIGS: [AudioStreamConfig; 3] = [
    AudioStreamConfig::new(AudioSource::RawUnprocessedMic, 48_000),
    AudioStreamConfig::new(AudioSource::StandardMic, 48_000),
    AudioStreamConfig::new(AudioSource::StandardMic, 44_100),
];

/// The stream chosen by [`negotiate`] plus the read buffer length to use with it.
pub struct NegotiatedStream<S> {
    pub stream: S,
    pub config: AudioStreamConfig,
    pub read_frames: usize,
}

/// Read length for a stream: the platform minimum, or one second of samples
/// when the platform reported none.
pub fn read_buffer_frames(min_frames: usize, sample_rate: u32) -> usize {
    if min_frames > 0 {
        min_frames
    } else {
        sample_rate as usize
    }
}

/// Try `candidates` in order and return the first stream that initializes.
///
/// Candidates with an unsupported buffer size are skipped without opening
/// anything. Streams that open but do not initialize are released before
/// moving on.
pub fn negotiate<P: CapturePlatform>(
    platform: &P,
    candidates: &[AudioStreamConfig],
) -> Result<NegotiatedStream<P::Stream>> {
    for config in candidates {
        let min_frames = match platform.min_buffer_size(config) {
            MinBufferSize::Frames(n) => n,
            MinBufferSize::Unsupported => {
                log::debug!("Capture candidate {:?} unsupported, skipping", config);
                continue;
            }
        };
        let read_frames = read_buffer_frames(min_frames, config.sample_rate);

        let mut stream = match platform.open(config, read_frames) {
            Ok(stream) => stream,
            Err(e) => {
                log::debug!("Capture candidate {:?} failed to open: {:#}", config, e);
                continue;
            }
        };
        if !stream.is_initialized() {
            log::debug!("Capture candidate {:?} did not initialize", config);
            stream.release();
            continue;
        }

        log::info!(
            "Capture negotiated: source={:?}, rate={}, read_frames={}",
            config.source,
            config.sample_rate,
            read_frames,
        );
        return Ok(NegotiatedStream {
            stream,
            config: *config,
            read_frames,
        });
    }
    Err(MeasureError::NoUsableAudioDevice)
}

/// Best-effort: switch off every available conditioning effect.
pub fn disable_signal_conditioning<S: CaptureStream + ?Sized>(stream: &mut S) {
    for effect in SignalEffect::ALL {
        if !stream.effect_available(effect) {
            continue;
        }
        if let Err(e) = stream.disable_effect(effect) {
            log::debug!("Could not disable {:?}: {:#}", effect, e);
        }
    }
}
