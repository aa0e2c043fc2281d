//! The capture session that owns the sampling thread.
//!
//! Uses std::thread (NOT tokio tasks): every read blocks until the device
//! delivers a block.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;

use super::level::{LevelParams, LevelState};
use super::negotiator::{disable_signal_conditioning, negotiate, PREFERRED_CONFIGS};
use super::stream::{CapturePlatform, CaptureStream};
use crate::error::MeasureError;

/// Receiver of smoothed levels produced by the sampling loop.
pub trait LevelSink: Send + Sync {
    fn on_level(&self, decibel: f64);

    /// No configuration could be opened; no levels will follow this session.
    fn on_level_unavailable(&self);
}

/// One capture session: a sampling thread plus its run flag.
///
/// Stopping only flips the flag, which the loop checks between reads, so a
/// read already in flight completes before the thread notices. An unresponsive
/// driver can therefore hold `stop()` for as long as the read blocks.
pub struct CaptureSession {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Spawn the sampling thread.
    ///
    /// A `previous` session is signalled and joined on the new thread before it
    /// negotiates, so the old stream is released before the device is reopened
    /// and the caller never waits on it.
    pub fn start<P>(
        platform: P,
        params: LevelParams,
        sink: Arc<dyn LevelSink>,
        previous: Option<CaptureSession>,
    ) -> Result<Self>
    where
        P: CapturePlatform + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let previous = previous.and_then(|mut p| {
            p.signal_stop();
            p.handle.take()
        });

        let handle = {
            let running = running.clone();
            thread::Builder::new()
                .name("audio-level".into())
                .spawn(move || {
                    if let Some(h) = previous {
                        if h.join().is_err() {
                            log::error!("Previous sampling thread panicked");
                        }
                    }
                    level_thread(&platform, params, sink.as_ref(), &running)
                })?
        };

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Ask the loop to exit after its current read, without waiting.
    pub fn signal_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Signal the loop and wait for the thread to finish.
    pub fn stop(&mut self) {
        self.signal_stop();
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                log::error!("Sampling thread panicked");
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn level_thread<P: CapturePlatform>(
    platform: &P,
    params: LevelParams,
    sink: &dyn LevelSink,
    running: &AtomicBool,
) {
    let negotiated = match negotiate(platform, &PREFERRED_CONFIGS) {
        Ok(negotiated) => negotiated,
        Err(e) => {
            log::error!("Sound level unavailable: {}", e);
            sink.on_level_unavailable();
            return;
        }
    };

    let mut stream = negotiated.stream;
    disable_signal_conditioning(&mut stream);

    let mut read_buf = vec![0i16; negotiated.read_frames];
    let mut level = LevelState::new(params);

    log::info!(
        "Sampling started: source={:?}, rate={}, read_frames={}",
        negotiated.config.source,
        negotiated.config.sample_rate,
        negotiated.read_frames,
    );

    while running.load(Ordering::SeqCst) {
        let frames = match stream.read(&mut read_buf) {
            Ok(0) | Err(MeasureError::TransientReadFailure) => {
                log::debug!("Empty audio read, skipping tick");
                continue;
            }
            Ok(frames) => frames,
            Err(e) => {
                log::error!("Sampling loop ending: {}", e);
                break;
            }
        };

        // The read may have been in flight when stop was requested
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let decibel = level.update(&read_buf[..frames.min(read_buf.len())]);
        sink.on_level(decibel);
    }

    stream.release();
    log::info!("Sampling stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::negotiator::fake::{FakePlatform, Verdict};
    use crate::audio::stream::{AudioStreamConfig, MinBufferSize, SignalEffect};
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Collect {
        levels: Mutex<Vec<f64>>,
        unavailable: AtomicBool,
    }

    impl LevelSink for Collect {
        fn on_level(&self, decibel: f64) {
            self.levels.lock().unwrap().push(decibel);
        }

        fn on_level_unavailable(&self) {
            self.unavailable.store(true, Ordering::SeqCst);
        }
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        for _ in 0..500 {
            if done() {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("condition not reached");
    }

    #[test]
    fn loop_skips_empty_reads_and_smooths() {
        let mut platform = FakePlatform::new([Verdict::Accept(4), Verdict::Unsupported, Verdict::Unsupported]);
        platform.effects.insert(SignalEffect::EchoCancellation);
        {
            let mut reads = platform.reads.lock().unwrap();
            reads.push_back(vec![i16::MAX, -i16::MAX, i16::MAX, -i16::MAX]);
            reads.push_back(Vec::new());
            reads.push_back(vec![i16::MAX, -i16::MAX, i16::MAX, -i16::MAX]);
        }
        let journal = platform.journal.clone();
        let sink = Arc::new(Collect::default());

        let mut session = CaptureSession::start(platform, LevelParams::default(), sink.clone(), None).unwrap();
        // the fake reports a device error once drained, which ends the loop
        wait_for(|| journal.lock().unwrap().released == 1);
        session.stop();

        let levels = sink.levels.lock().unwrap().clone();
        assert_eq!(levels.len(), 2);
        assert!((levels[0] - 20.0).abs() < 0.01);
        assert!((levels[1] - 36.0).abs() < 0.01);
        assert_eq!(journal.lock().unwrap().disabled, vec![SignalEffect::EchoCancellation]);
    }

    #[test]
    fn no_device_reports_unavailable() {
        let platform = FakePlatform::new([Verdict::Unsupported; 3]);
        let journal = platform.journal.clone();
        let sink = Arc::new(Collect::default());

        let mut session = CaptureSession::start(platform, LevelParams::default(), sink.clone(), None).unwrap();
        wait_for(|| sink.unavailable.load(Ordering::SeqCst));
        session.stop();

        assert!(sink.levels.lock().unwrap().is_empty());
        assert!(journal.lock().unwrap().opened.is_empty());
    }

    /// Stream whose reads block until the test hands over a block.
    struct GatedStream {
        blocks: mpsc::Receiver<Vec<i16>>,
        entered: mpsc::Sender<()>,
    }

    struct GatedPlatform(Mutex<Option<GatedStream>>);

    impl CapturePlatform for GatedPlatform {
        type Stream = GatedStream;

        fn min_buffer_size(&self, _config: &AudioStreamConfig) -> MinBufferSize {
            MinBufferSize::Frames(8)
        }

        fn open(&self, _config: &AudioStreamConfig, _buffer_frames: usize) -> anyhow::Result<GatedStream> {
            self.0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| anyhow::anyhow!("already opened"))
        }
    }

    impl CaptureStream for GatedStream {
        fn is_initialized(&self) -> bool {
            true
        }

        fn read(&mut self, buf: &mut [i16]) -> std::result::Result<usize, MeasureError> {
            let _ = self.entered.send(());
            match self.blocks.recv() {
                Ok(block) => {
                    buf[..block.len()].copy_from_slice(&block);
                    Ok(block.len())
                }
                Err(_) => Err(MeasureError::Device("gate closed".into())),
            }
        }

        fn effect_available(&self, _effect: SignalEffect) -> bool {
            false
        }

        fn disable_effect(&mut self, _effect: SignalEffect) -> anyhow::Result<()> {
            Ok(())
        }

        fn release(&mut self) {}
    }

    #[test]
    fn in_flight_read_after_stop_is_not_published() {
        let (block_tx, block_rx) = mpsc::channel();
        let (entered_tx, entered_rx) = mpsc::channel();
        let platform = GatedPlatform(Mutex::new(Some(GatedStream {
            blocks: block_rx,
            entered: entered_tx,
        })));
        let sink = Arc::new(Collect::default());
        let mut session = CaptureSession::start(platform, LevelParams::default(), sink.clone(), None).unwrap();

        entered_rx.recv().unwrap();
        block_tx.send(vec![1000; 8]).unwrap();
        // second read is now in flight
        entered_rx.recv().unwrap();
        assert_eq!(sink.levels.lock().unwrap().len(), 1);

        session.signal_stop();
        block_tx.send(vec![1000; 8]).unwrap();
        session.stop();

        assert_eq!(sink.levels.lock().unwrap().len(), 1);
    }

    #[test]
    fn restart_waits_for_previous_thread() {
        let (block_tx, block_rx) = mpsc::channel();
        let (entered_tx, entered_rx) = mpsc::channel();
        let gated = GatedPlatform(Mutex::new(Some(GatedStream {
            blocks: block_rx,
            entered: entered_tx,
        })));
        let old_sink = Arc::new(Collect::default());
        let old = CaptureSession::start(gated, LevelParams::default(), old_sink.clone(), None).unwrap();
        // old thread is parked inside a read
        entered_rx.recv().unwrap();

        let platform = FakePlatform::new([Verdict::Accept(4), Verdict::Unsupported, Verdict::Unsupported]);
        let journal = platform.journal.clone();
        let sink = Arc::new(Collect::default());
        let mut session = CaptureSession::start(platform, LevelParams::default(), sink.clone(), Some(old)).unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(journal.lock().unwrap().queried.is_empty());

        block_tx.send(vec![1000; 8]).unwrap();
        wait_for(|| journal.lock().unwrap().released == 1);
        session.stop();

        assert!(old_sink.levels.lock().unwrap().is_empty());
        assert_eq!(journal.lock().unwrap().opened.len(), 1);
    }
}
