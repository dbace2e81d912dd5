//! Shipyard HTTP API models

pub mod models;
