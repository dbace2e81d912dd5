//! Deployment metrics models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "24h")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::OneHour => "1h",
            TimeRange::OneDay => "24h",
            TimeRange::SevenDays => "7d",
            TimeRange::ThirtyDays => "30d",
        }
    }

    /// Number of timeline buckets
    pub fn bucket_count(&self) -> usize {
        match self {
            TimeRange::OneHour => 12,
            TimeRange::OneDay => 24,
            TimeRange::SevenDays => 28,
            TimeRange::ThirtyDays => 30,
        }
    }

    /// Width of one timeline bucket
    pub fn bucket_width(&self) -> TimeDelta {
        match self {
            TimeRange::OneHour => TimeDelta::minutes(5),
            TimeRange::OneDay => TimeDelta::hours(1),
            TimeRange::SevenDays => TimeDelta::hours(6),
            TimeRange::ThirtyDays => TimeDelta::days(1),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(TimeRange::OneHour),
            "24h" => Ok(TimeRange::OneDay),
            "7d" => Ok(TimeRange::SevenDays),
            "30d" => Ok(TimeRange::ThirtyDays),
            _ => Err(DeployError::Validation(format!("Unsupported time range: {}", s))),
        }
    }
}

/// Counters for one timeline bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBucket {
    /// Start of the bucket
    pub timestamp: DateTime<Utc>,
    pub requests: u64,
    /// Bytes served
    pub bandwidth: u64,
    pub errors: u64,
    /// Mean response time in milliseconds
    pub response_time: f64,
    /// Fraction of the bucket the target was up (0-1)
    pub uptime: f64,
}

/// Aggregated metrics of a project's live deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub project_id: String,
    pub deployment_id: String,
    pub time_range: TimeRange,
    pub requests: u64,
    pub bandwidth: u64,
    pub errors: u64,
    pub response_time: f64,
    pub uptime: f64,
    pub timeline: Vec<MetricsBucket>,
}
