//! Record storage and settings

pub mod log_sink;
pub mod settings;
pub mod store;
