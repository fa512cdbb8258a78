//! Current-reading capability.
//!
//! The ranker never talks to the hardware link directly. It asks a
//! [`ReadingProvider`] for the latest snapshot, so the same code serves
//! serial-fed deployments, HTTP-push deployments, and tests with a
//! stubbed provider.

use async_trait::async_trait;
use tokio::sync::RwLock;

use shared_types::{LinkFrame, MotorStatus, SensorReading};

#[async_trait]
pub trait ReadingProvider: Send + Sync {
    /// Latest complete sensor snapshot, if any has arrived.
    async fn latest(&self) -> Option<SensorReading>;
}

#[derive(Debug, Default)]
struct LinkState {
    reading: Option<SensorReading>,
    motor: Option<MotorStatus>,
}

/// Latest-frame snapshot shared between the ingestion paths (serial task,
/// HTTP push) and the readers (ranker, sensor endpoints).
#[derive(Debug, Default)]
pub struct LatestReading {
    state: RwLock<LinkState>,
}

impl LatestReading {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame from the hardware link. A frame missing sensor
    /// fields leaves the previous reading in place; a motor field always
    /// updates the pump status.
    pub async fn apply(&self, frame: &LinkFrame) {
        let mut state = self.state.write().await;
        if let Some(reading) = frame.reading() {
            state.reading = Some(reading);
        }
        if let Some(motor) = frame.motor {
            state.motor = Some(if motor == 1 {
                MotorStatus::Online
            } else {
                MotorStatus::Offline
            });
        }
    }

    /// Mark the pump offline, e.g. when the serial link drops.
    pub async fn set_motor_offline(&self) {
        self.state.write().await.motor = Some(MotorStatus::Offline);
    }

    pub async fn motor_status(&self) -> MotorStatus {
        self.state.read().await.motor.unwrap_or(MotorStatus::Offline)
    }
}

#[async_trait]
impl ReadingProvider for LatestReading {
    async fn latest(&self) -> Option<SensorReading> {
        self.state.read().await.reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(value: serde_json::Value) -> LinkFrame {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn partial_frame_keeps_previous_reading() {
        let link = LatestReading::new();
        link.apply(&frame(json!({
            "N": 120.0, "P": 60.0, "K": 80.0,
            "temperature": 26.0, "soil_moisture": 50.0, "ph": 6.5
        })))
        .await;
        link.apply(&frame(json!({ "motor": 0 }))).await;

        let latest = link.latest().await.unwrap();
        assert_eq!(latest.n, 120.0);
        assert_eq!(link.motor_status().await, MotorStatus::Offline);
    }

    #[tokio::test]
    async fn motor_defaults_to_offline_until_reported() {
        let link = LatestReading::new();
        assert_eq!(link.motor_status().await, MotorStatus::Offline);
        link.apply(&frame(json!({ "motor": 1 }))).await;
        assert_eq!(link.motor_status().await, MotorStatus::Online);
    }
}
