use std::sync::Arc;

use crate::alerts::{Mailer, MoistureAlerts};
use crate::classifier::Classifier;
use crate::oracle::CropAi;
use crate::reading::LatestReading;
use crate::store::CropStore;

/// Shared backend state. Oracles sit behind trait objects so tests can
/// swap in deterministic stubs.
pub struct AppState {
    pub link: Arc<LatestReading>,
    pub crops: CropStore,
    pub classifier: Arc<dyn Classifier>,
    pub ai: Arc<dyn CropAi>,
    pub alerts: Arc<MoistureAlerts>,
    pub mailer: Arc<dyn Mailer>,
}
