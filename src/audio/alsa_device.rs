//! ALSA binding for the capture seam: buffer probing, PCM capture and
//! mixer-switch effect control.

use alsa::mixer::{Mixer, Selem, SelemId};
use alsa::pcm::{Access, Format, Frames, HwParams, State, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

use super::stream::{
    AudioSource, AudioStreamConfig, CapturePlatform, CaptureStream, MinBufferSize, SignalEffect,
};
use crate::error::MeasureError;

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Period size in frames
    pub period_size: usize,
    /// Ring buffer size in frames
    pub buffer_size: usize,
}

fn configure(pcm: &PCM, sample_rate: u32, channels: u32) -> Result<HwParams<'_>> {
    let hwp = HwParams::any(pcm).with_context(|| "Failed to initialize HwParams")?;
    hwp.set_access(Access::RWInterleaved)?;
    hwp.set_format(Format::S16LE)?;
    hwp.set_channels(channels)?;
    // Exact rate: a resampled stream would not be the configuration we asked for
    hwp.set_rate(sample_rate, ValueOr::Nearest)?;
    Ok(hwp)
}

/// Minimum buffer size in frames for capturing from `device` at `sample_rate`.
///
/// Uses a throwaway non-blocking handle that is closed before returning.
pub fn probe_min_buffer(device: &str, sample_rate: u32, channels: u32) -> MinBufferSize {
    let probe = || -> Result<usize> {
        let pcm = PCM::new(device, Direction::Capture, true)
            .with_context(|| format!("Failed to probe PCM device '{}'", device))?;
        let hwp = configure(&pcm, sample_rate, channels)?;
        Ok(hwp.get_buffer_size_min()? as usize)
    };
    match probe() {
        Ok(frames) => MinBufferSize::Frames(frames),
        Err(e) => {
            log::debug!("ALSA probe {}@{}Hz rejected: {:#}", device, sample_rate, e);
            MinBufferSize::Unsupported
        }
    }
}

/// Ring buffer to request for a given read length: room for two reads, so
/// the device keeps filling while one is being consumed.
fn ring_buffer_frames(read_frames: usize) -> Frames {
    read_frames.saturating_mul(2).min(Frames::MAX as usize) as Frames
}

/// Open a PCM device for blocking capture with reads of `read_frames`.
pub fn open_capture(
    device: &str,
    sample_rate: u32,
    channels: u32,
    read_frames: usize,
) -> Result<(PCM, AlsaParams)> {
    let pcm = PCM::new(device, Direction::Capture, false)
        .with_context(|| format!("Failed to open PCM device '{}' for Capture", device))?;

    {
        let hwp = configure(&pcm, sample_rate, channels)?;
        hwp.set_buffer_size_near(ring_buffer_frames(read_frames))?;
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let (actual_rate, actual_channels, period_size, buffer_size) = {
        let hwp = pcm.hw_params_current()?;
        let rate = hwp.get_rate()?;
        let ch = hwp.get_channels()?;
        let ps = hwp.get_period_size()? as usize;
        let bs = hwp.get_buffer_size()? as usize;
        (rate, ch, ps, bs)
    };

    let params = AlsaParams {
        sample_rate: actual_rate,
        channels: actual_channels,
        period_size,
        buffer_size,
    };

    log::info!(
        "ALSA Capture: device={}, rate={}, channels={}, period_size={}, buffer_size={}, read_frames={}",
        device,
        actual_rate,
        actual_channels,
        period_size,
        buffer_size,
        read_frames,
    );

    Ok((pcm, params))
}

/// Mixer (card) name that controls a PCM device, e.g. `plughw:1,0` → `hw:1`.
pub fn mixer_name(device: &str) -> String {
    let card = device
        .strip_prefix("plughw:")
        .or_else(|| device.strip_prefix("hw:"));
    match card {
        Some(rest) => {
            let card = rest.split(',').next().unwrap_or(rest);
            format!("hw:{}", card)
        }
        None => device.to_string(),
    }
}

/// Mixer element names drivers use for each conditioning effect.
fn control_names(effect: SignalEffect) -> &'static [&'static str] {
    match effect {
        SignalEffect::AutomaticGainControl => &["Auto Gain Control", "AGC", "Capture AGC"],
        SignalEffect::NoiseSuppression => &["Noise Suppression", "Noise Reduction", "Capture NS"],
        SignalEffect::EchoCancellation => &["Echo Cancellation", "AEC", "Capture AEC"],
    }
}

fn has_switch(selem: &Selem<'_>) -> bool {
    selem.has_capture_switch() || selem.has_playback_switch()
}

/// Capture platform backed by two ALSA PCM names.
#[derive(Debug, Clone)]
pub struct AlsaPlatform {
    /// Device used for `RawUnprocessedMic` (typically `hw:X,Y`)
    pub raw_device: String,
    /// Device used for `StandardMic` (typically `default`)
    pub standard_device: String,
}

impl AlsaPlatform {
    pub fn new(raw_device: impl Into<String>, standard_device: impl Into<String>) -> Self {
        Self {
            raw_device: raw_device.into(),
            standard_device: standard_device.into(),
        }
    }

    fn device_for(&self, source: AudioSource) -> &str {
        match source {
            AudioSource::RawUnprocessedMic => &self.raw_device,
            AudioSource::StandardMic => &self.standard_device,
        }
    }
}

impl CapturePlatform for AlsaPlatform {
    type Stream = AlsaStream;

    fn min_buffer_size(&self, config: &AudioStreamConfig) -> MinBufferSize {
        probe_min_buffer(
            self.device_for(config.source),
            config.sample_rate,
            AudioStreamConfig::CHANNELS,
        )
    }

    fn open(&self, config: &AudioStreamConfig, buffer_frames: usize) -> Result<AlsaStream> {
        let device = self.device_for(config.source);
        let (pcm, params) =
            open_capture(device, config.sample_rate, AudioStreamConfig::CHANNELS, buffer_frames)?;
        if params.sample_rate != config.sample_rate || params.channels != AudioStreamConfig::CHANNELS {
            anyhow::bail!(
                "'{}' negotiated {}Hz/{}ch instead of {}Hz/mono",
                device,
                params.sample_rate,
                params.channels,
                config.sample_rate
            );
        }
        Ok(AlsaStream {
            pcm: Some(pcm),
            mixer: mixer_name(device),
        })
    }
}

/// A blocking mono S16LE capture PCM.
pub struct AlsaStream {
    pcm: Option<PCM>,
    mixer: String,
}

impl AlsaStream {
    fn with_switch<T>(&self, effect: SignalEffect, f: impl FnOnce(&Selem<'_>) -> Result<T>) -> Result<Option<T>> {
        let mixer = Mixer::new(&self.mixer, false)
            .with_context(|| format!("Failed to open mixer '{}'", self.mixer))?;
        for name in control_names(effect) {
            if let Some(selem) = mixer.find_selem(&SelemId::new(name, 0)) {
                if has_switch(&selem) {
                    return f(&selem).map(Some);
                }
            }
        }
        Ok(None)
    }
}

impl CaptureStream for AlsaStream {
    fn is_initialized(&self) -> bool {
        matches!(
            self.pcm.as_ref().map(|pcm| pcm.state()),
            Some(State::Prepared) | Some(State::Running)
        )
    }

    fn read(&mut self, buf: &mut [i16]) -> Result<usize, MeasureError> {
        let pcm = self
            .pcm
            .as_ref()
            .ok_or_else(|| MeasureError::Device("capture stream released".into()))?;
        let io = pcm
            .io_i16()
            .map_err(|e| MeasureError::Device(e.to_string()))?;
        match io.readi(buf) {
            Ok(frames) => Ok(frames),
            Err(e) => {
                log::warn!("ALSA capture error: {}, recovering...", e);
                match pcm.prepare() {
                    Ok(()) => Err(MeasureError::TransientReadFailure),
                    Err(e2) => Err(MeasureError::Device(format!(
                        "Failed to recover PCM capture: {}",
                        e2
                    ))),
                }
            }
        }
    }

    fn effect_available(&self, effect: SignalEffect) -> bool {
        matches!(self.with_switch(effect, |_| Ok(())), Ok(Some(())))
    }

    fn disable_effect(&mut self, effect: SignalEffect) -> Result<()> {
        let applied = self.with_switch(effect, |selem| {
            if selem.has_capture_switch() {
                selem.set_capture_switch_all(0)?;
            } else {
                selem.set_playback_switch_all(0)?;
            }
            Ok(())
        })?;
        match applied {
            Some(()) => {
                log::info!("Disabled {:?} on mixer '{}'", effect, self.mixer);
                Ok(())
            }
            None => anyhow::bail!("{:?} has no switch on mixer '{}'", effect, self.mixer),
        }
    }

    fn release(&mut self) {
        if let Some(pcm) = self.pcm.take() {
            if let Err(e) = pcm.drop() {
                log::debug!("PCM drop on release failed: {}", e);
            }
        }
    }
}

impl Drop for AlsaStream {
    fn drop(&mut self) {
        self.release();
    }
}
