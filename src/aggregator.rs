//! Fuses the latest pressure/altitude and the latest sound level into one
//! snapshot and publishes it on every update.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::audio::LevelSink;

/// The externally visible snapshot.
///
/// Pressure and decibel are paced independently; they are not guaranteed to
/// come from the same instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FusedReading {
    pub pressure_hpa: f32,
    pub altitude_meters: f32,
    pub decibel: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sensing,
}

struct Shared {
    state: SessionState,
    reading: FusedReading,
}

/// Single lock around the snapshot: an update and its publication happen
/// under the same guard, so every published reading is a whole one and
/// nothing is published once the session is idle.
pub struct MeasurementAggregator {
    shared: Mutex<Shared>,
    tx: mpsc::Sender<FusedReading>,
}

impl MeasurementAggregator {
    pub fn new(tx: mpsc::Sender<FusedReading>) -> Self {
        Self {
            shared: Mutex::new(Shared {
                state: SessionState::Idle,
                reading: FusedReading::default(),
            }),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `Idle → Sensing`. Returns false if already sensing.
    pub fn start(&self) -> bool {
        let mut shared = self.lock();
        if shared.state == SessionState::Sensing {
            return false;
        }
        shared.state = SessionState::Sensing;
        shared.reading = FusedReading::default();
        true
    }

    /// `Sensing → Idle`. Idempotent; returns false if already idle.
    pub fn stop(&self) -> bool {
        let mut shared = self.lock();
        if shared.state == SessionState::Idle {
            return false;
        }
        shared.state = SessionState::Idle;
        shared.reading = FusedReading::default();
        true
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn snapshot(&self) -> FusedReading {
        self.lock().reading
    }

    /// Record a pressure event. Returns whether a reading was published.
    pub fn on_pressure(&self, pressure_hpa: f32, altitude_meters: f32) -> bool {
        self.update(|reading| {
            reading.pressure_hpa = pressure_hpa;
            reading.altitude_meters = altitude_meters;
        })
    }

    /// Record a smoothed level. Returns whether a reading was published.
    pub fn on_level(&self, decibel: f64) -> bool {
        self.update(|reading| reading.decibel = decibel)
    }

    fn update(&self, apply: impl FnOnce(&mut FusedReading)) -> bool {
        let mut shared = self.lock();
        if shared.state != SessionState::Sensing {
            return false;
        }
        apply(&mut shared.reading);
        // Fire-and-forget: a full or closed channel drops this reading
        match self.tx.try_send(shared.reading) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Reading dropped: {}", e);
                false
            }
        }
    }
}

impl LevelSink for MeasurementAggregator {
    fn on_level(&self, decibel: f64) {
        MeasurementAggregator::on_level(self, decibel);
    }

    fn on_level_unavailable(&self) {
        log::warn!("No level data available; readings will carry pressure only");
    }
}
