//! Hardware-link ingestion.
//!
//! The sensor board streams one JSON object per line over a serial
//! connection. This task tails the link, updates the latest-reading
//! snapshot, and runs the moisture alert check on every frame carrying
//! a moisture value. Malformed lines are logged and skipped; losing the
//! link degrades to HTTP push only.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{info, warn};

use shared_types::LinkFrame;

use crate::alerts::MoistureAlerts;
use crate::reading::LatestReading;

#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
}

pub async fn run_serial_ingest(
    settings: SerialSettings,
    link: Arc<LatestReading>,
    alerts: Arc<MoistureAlerts>,
) {
    let port = match tokio_serial::new(&settings.port, settings.baud).open_native_async() {
        Ok(port) => port,
        Err(e) => {
            warn!(port = %settings.port, error = %e, "could not open serial port; hardware link disabled");
            link.set_motor_offline().await;
            return;
        }
    };
    info!(port = %settings.port, baud = settings.baud, "hardware link connected");

    let mut lines = FramedRead::new(port, LinesCodec::new());
    while let Some(next) = lines.next().await {
        let line = match next {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "serial read failed; hardware link closed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<LinkFrame>(line) {
            Ok(frame) => {
                link.apply(&frame).await;
                if let Some(moisture) = frame.soil_moisture {
                    alerts.check(moisture).await;
                }
            }
            Err(e) => warn!(error = %e, line, "invalid JSON frame from hardware link"),
        }
    }

    link.set_motor_offline().await;
}
