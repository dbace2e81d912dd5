//! Deployment module

pub mod executor;
pub mod fsm;
pub mod pipeline;
pub mod publish;
