//! Shipyard Library
//!
//! Core modules for the Shipyard deployment orchestrator.

pub mod app;
pub mod authz;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod models;
pub mod server;
pub mod services;
pub mod storage;
pub mod telemetry;
pub mod utils;
pub mod workers;
