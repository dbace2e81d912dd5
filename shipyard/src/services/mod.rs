//! Orchestration services

pub mod deployments;
