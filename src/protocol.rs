use serde::{Deserialize, Serialize};

use crate::aggregator::FusedReading;
use crate::notification::NotificationContent;

/// Datagrams from the pressure sensor process.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SensorMessage {
    Pressure { pressure_hpa: f32 },
}

/// Commands from the display process.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Start {
        /// Microphone permission as seen by the display; falls back to config when absent
        #[serde(default)]
        microphone_granted: Option<bool>,
    },
    Stop,
}

/// Datagrams to the display process. Non-finite floats are sent as `null`.
#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DisplayMessage<'a> {
    Reading(&'a FusedReading),
    Notification(&'a NotificationContent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_pressure_event() {
        let msg: SensorMessage =
            serde_json::from_str(r#"{"type":"pressure","pressure_hpa":1002.5}"#).unwrap();
        assert_eq!(msg, SensorMessage::Pressure { pressure_hpa: 1002.5 });
    }

    #[test]
    fn parses_control_commands() {
        let start: ControlMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert_eq!(start, ControlMessage::Start { microphone_granted: None });
        let start: ControlMessage =
            serde_json::from_str(r#"{"type":"start","microphone_granted":false}"#).unwrap();
        assert_eq!(start, ControlMessage::Start { microphone_granted: Some(false) });
        let stop: ControlMessage = serde_json::from_str(r#"{"type":"stop"}"#).unwrap();
        assert_eq!(stop, ControlMessage::Stop);
        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"reboot"}"#).is_err());
    }

    #[test]
    fn reading_is_tagged_and_flat() {
        let reading = FusedReading {
            pressure_hpa: 1000.0,
            altitude_meters: 110.5,
            decibel: 42.0,
        };
        let value = serde_json::to_value(DisplayMessage::Reading(&reading)).unwrap();
        assert_eq!(
            value,
            json!({"type":"reading","pressure_hpa":1000.0,"altitude_meters":110.5,"decibel":42.0})
        );

        let invalid = FusedReading {
            pressure_hpa: 0.0,
            altitude_meters: f32::NAN,
            decibel: 0.0,
        };
        let value = serde_json::to_value(DisplayMessage::Reading(&invalid)).unwrap();
        assert!(value["altitude_meters"].is_null());
        assert_eq!(value["pressure_hpa"], 0.0);
    }

    #[test]
    fn notification_carries_alert_once() {
        let content = NotificationContent::initializing();
        let value = serde_json::to_value(DisplayMessage::Notification(&content)).unwrap();
        assert_eq!(value["type"], "notification");
        assert_eq!(value["only_alert_once"], true);
    }
}
