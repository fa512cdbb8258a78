//! Smart-agriculture backend: sensor ingestion, a flat-file crop
//! knowledgebase, and the crop recommendation ranker behind an HTTP API.

pub mod alerts;
pub mod api;
pub mod app_state;
pub mod classifier;
pub mod config;
pub mod oracle;
pub mod ranker;
pub mod reading;
pub mod retry;
pub mod serial_link;
pub mod store;
