use crate::aggregator::{FusedReading, MeasurementAggregator};
use crate::altitude;
use crate::audio::{CapturePlatform, CaptureSession, LevelParams, LevelSink};
use crate::config::Config;
use crate::gui_bridge::GuiEvent;
use crate::notification::{NotificationContent, StatusNotifier};
use crate::protocol::ControlMessage;
use crate::sensor_bridge::SensorEvent;
use std::sync::Arc;

/// Owns the sensing session: `Idle → Sensing` on start, back on stop.
pub struct CoreController<P> {
    sea_level_hpa: f32,
    microphone_permission: bool,
    params: LevelParams,
    platform: P,
    aggregator: Arc<MeasurementAggregator>,
    capture: Option<CaptureSession>,
    /// Signalled session whose thread may still be finishing its last read
    retired: Option<CaptureSession>,
    notifier: StatusNotifier,
}

impl<P> CoreController<P>
where
    P: CapturePlatform + Clone + Send + 'static,
{
    pub fn new(
        config: &Config,
        params: LevelParams,
        platform: P,
        aggregator: Arc<MeasurementAggregator>,
    ) -> Self {
        Self {
            sea_level_hpa: config.sea_level_hpa,
            microphone_permission: config.microphone_permission,
            params,
            platform,
            aggregator,
            capture: None,
            retired: None,
            notifier: StatusNotifier::new(),
        }
    }

    pub fn is_sensing(&self) -> bool {
        self.aggregator.state() == crate::aggregator::SessionState::Sensing
    }

    /// Begin sensing. Sound capture only starts when the microphone
    /// permission is granted; pressure sensing starts regardless.
    pub fn start(&mut self, microphone_granted: bool) -> bool {
        if !self.aggregator.start() {
            log::info!("Start ignored: already sensing");
            return false;
        }
        self.notifier.reset();
        log::info!("Sensing started");

        if !microphone_granted {
            log::warn!("Microphone permission denied; sound level will not be captured");
            return true;
        }
        let sink: Arc<dyn LevelSink> = self.aggregator.clone();
        let previous = self.retired.take();
        match CaptureSession::start(self.platform.clone(), self.params, sink, previous) {
            Ok(session) => self.capture = Some(session),
            Err(e) => log::error!("Failed to start sampling thread: {:#}", e),
        }
        true
    }

    /// Stop sensing. Safe to call when already idle.
    ///
    /// Does not wait for the sampling thread; the next session or `Drop`
    /// joins it.
    pub fn stop(&mut self) {
        // Gate publication first so a read completing during shutdown is dropped
        let was_sensing = self.aggregator.stop();
        self.notifier.reset();
        if let Some(session) = self.capture.take() {
            session.signal_stop();
            self.retired = Some(session);
        }
        if was_sensing {
            log::info!("Sensing stopped");
        }
    }

    pub fn handle_sensor_event(&mut self, event: SensorEvent) {
        let SensorEvent::Pressure(pressure_hpa) = event;
        if !self.is_sensing() {
            return;
        }
        let altitude = match altitude::try_altitude(pressure_hpa, self.sea_level_hpa) {
            Ok(meters) => meters,
            Err(e) => {
                log::warn!("{}; publishing NaN altitude", e);
                f32::NAN
            }
        };
        self.aggregator.on_pressure(pressure_hpa, altitude);
    }

    /// Apply a display command. Returns the notification to show when a
    /// session has just started.
    pub fn handle_gui_event(&mut self, event: GuiEvent) -> Option<NotificationContent> {
        let GuiEvent::Command(cmd) = event;
        match cmd {
            ControlMessage::Start { microphone_granted } => {
                let granted = microphone_granted.unwrap_or(self.microphone_permission);
                self.start(granted).then(NotificationContent::initializing)
            }
            ControlMessage::Stop => {
                self.stop();
                None
            }
        }
    }

    /// Notification refresh for a published reading, if its text changed.
    /// Readings queued before a stop yield nothing.
    pub fn handle_reading(&mut self, reading: &FusedReading) -> Option<NotificationContent> {
        if !self.is_sensing() {
            return None;
        }
        self.notifier.update(reading)
    }
}

impl<P> Drop for CoreController<P> {
    fn drop(&mut self) {
        self.aggregator.stop();
        if let Some(mut session) = self.capture.take() {
            session.stop();
        }
        if let Some(mut session) = self.retired.take() {
            session.stop();
        }
    }
}
