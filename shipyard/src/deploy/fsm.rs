//! Finite State Machine for deployment records
//!
//! Every status change of a [`DeploymentRecord`] goes through [`process`], which
//! callers invoke while holding the record's write lock. Terminal states have
//! no outgoing transitions; a cancel against them is accepted as a no-op.

use std::fmt;

use chrono::Utc;

use crate::errors::DeployError;
use crate::models::deployment::{DeploymentRecord, DeploymentStatus};

/// Deployment event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentEvent {
    /// Executor starts the first pipeline step
    Begin,

    /// Final pipeline step succeeded
    Succeed { url: String, preview_url: String },

    /// A pipeline step failed
    Fail(String),

    /// Caller requested cancellation
    Cancel,
}

impl fmt::Display for DeploymentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentEvent::Begin => f.write_str("begin"),
            DeploymentEvent::Succeed { .. } => f.write_str("succeed"),
            DeploymentEvent::Fail(_) => f.write_str("fail"),
            DeploymentEvent::Cancel => f.write_str("cancel"),
        }
    }
}

/// Outcome of processing an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The record moved to a new status
    Applied {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },

    /// The event was accepted without changing the record
    Unchanged,
}

/// Apply `event` to `record`
pub fn process(
    record: &mut DeploymentRecord,
    event: DeploymentEvent,
) -> Result<Transition, DeployError> {
    let from = record.status;
    let now = Utc::now();

    let to = match (from, event) {
        (DeploymentStatus::Pending, DeploymentEvent::Begin) => DeploymentStatus::Building,

        (DeploymentStatus::Building, DeploymentEvent::Succeed { url, preview_url }) => {
            record.url = Some(url);
            record.preview_url = Some(preview_url);
            record.completed_at = Some(now);
            DeploymentStatus::Success
        }
        (DeploymentStatus::Building, DeploymentEvent::Fail(error)) => {
            record.error = Some(error);
            record.completed_at = Some(now);
            DeploymentStatus::Failed
        }

        (DeploymentStatus::Pending | DeploymentStatus::Building, DeploymentEvent::Cancel) => {
            record.completed_at = Some(now);
            DeploymentStatus::Cancelled
        }
        (state, DeploymentEvent::Cancel) if state.is_terminal() => {
            return Ok(Transition::Unchanged);
        }

        (state, event) => {
            return Err(DeployError::InvalidState(format!(
                "Invalid transition: {} -> {}",
                state, event
            )));
        }
    };

    record.status = to;
    record.updated_at = now;
    Ok(Transition::Applied { from, to })
}
