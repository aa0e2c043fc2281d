//! Persistent status notification text.

use serde::Serialize;

use crate::aggregator::FusedReading;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationContent {
    pub title: String,
    pub text: String,
    pub ongoing: bool,
    /// Refresh visually only; never re-alert the user
    pub only_alert_once: bool,
}

impl NotificationContent {
    fn new(title: String, text: String) -> Self {
        Self {
            title,
            text,
            ongoing: true,
            only_alert_once: true,
        }
    }

    pub fn initializing() -> Self {
        Self::new("Initializing sensors...".to_string(), String::new())
    }
}

pub fn render(reading: &FusedReading) -> NotificationContent {
    NotificationContent::new(
        format!("Pressure: {:.2} hPa", reading.pressure_hpa),
        format!(
            "Altitude: {:.1} m | Sound: {:.1} dB",
            reading.altitude_meters, reading.decibel
        ),
    )
}

/// Coalesces notification refreshes: only changed text is sent.
#[derive(Debug, Default)]
pub struct StatusNotifier {
    last: Option<NotificationContent>,
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, reading: &FusedReading) -> Option<NotificationContent> {
        let content = render(reading);
        if self.last.as_ref() == Some(&content) {
            return None;
        }
        self.last = Some(content.clone());
        Some(content)
    }

    /// Forget the last content so the next update is always sent.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_altitude_and_level() {
        let content = render(&FusedReading {
            pressure_hpa: 1001.234,
            altitude_meters: 100.06,
            decibel: 45.26,
        });
        assert_eq!(content.title, "Pressure: 1001.23 hPa");
        assert_eq!(content.text, "Altitude: 100.1 m | Sound: 45.3 dB");
        assert!(content.only_alert_once);
    }

    #[test]
    fn nan_altitude_renders_without_panicking() {
        let content = render(&FusedReading {
            pressure_hpa: 0.0,
            altitude_meters: f32::NAN,
            decibel: 0.0,
        });
        assert!(content.text.contains("NaN"));
    }

    #[test]
    fn identical_text_is_coalesced() {
        let mut notifier = StatusNotifier::new();
        let reading = FusedReading {
            pressure_hpa: 1000.0,
            altitude_meters: 110.88,
            decibel: 30.0,
        };
        assert!(notifier.update(&reading).is_some());
        // sub-display-precision changes do not refresh
        let jitter = FusedReading {
            decibel: 30.01,
            ..reading
        };
        assert!(notifier.update(&jitter).is_none());
        let louder = FusedReading {
            decibel: 31.0,
            ..reading
        };
        assert!(notifier.update(&louder).is_some());
        notifier.reset();
        assert!(notifier.update(&louder).is_some());
    }
}
