//! Publish backend wire models

pub mod models;
