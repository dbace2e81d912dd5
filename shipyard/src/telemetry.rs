//! Telemetry and metrics reporting
//!
//! The reporter is a read-only facade over a [`TelemetrySource`]; it never
//! touches deployment records.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::errors::DeployError;
use crate::models::deployment::DeploymentRecord;
use crate::models::metrics::{MetricsBucket, MetricsReport, TimeRange};

/// Source of raw per-bucket counters for a live deployment
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Return exactly `range.bucket_count()` buckets, oldest first, the last
    /// one ending at `end`.
    async fn fetch(
        &self,
        deployment: &DeploymentRecord,
        range: TimeRange,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricsBucket>, DeployError>;
}

/// Telemetry source producing deterministic synthetic traffic.
///
/// Counters are derived from a SHA-256 of the deployment id and bucket start,
/// so repeated queries over the same window agree.
#[derive(Debug, Clone, Default)]
pub struct SyntheticTelemetry;

impl SyntheticTelemetry {
    fn bucket(deployment_id: &str, start: DateTime<Utc>, range: TimeRange) -> MetricsBucket {
        let mut hasher = Sha256::new();
        hasher.update(deployment_id.as_bytes());
        hasher.update(start.timestamp().to_le_bytes());
        let seed = hasher.finalize();

        let minutes = range.bucket_width().num_minutes().max(1) as u64;
        let per_minute = 20 + u64::from(seed[0]) % 200;
        let requests = per_minute * minutes;
        let errors = requests * (u64::from(seed[1]) % 4) / 100;
        let bytes_per_request = 20_000 + u64::from(u16::from_le_bytes([seed[2], seed[3]])) % 80_000;
        let response_time = 40.0 + f64::from(seed[4] % 160);
        let uptime = if seed[5] % 32 == 0 { 0.98 } else { 1.0 };

        MetricsBucket {
            timestamp: start,
            requests,
            bandwidth: requests * bytes_per_request,
            errors,
            response_time,
            uptime,
        }
    }
}

#[async_trait]
impl TelemetrySource for SyntheticTelemetry {
    async fn fetch(
        &self,
        deployment: &DeploymentRecord,
        range: TimeRange,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricsBucket>, DeployError> {
        let width = range.bucket_width();
        let count = range.bucket_count() as i32;

        Ok((0..count)
            .map(|i| {
                let start = end - width * (count - i);
                Self::bucket(&deployment.id, start, range)
            })
            .collect())
    }
}

/// End of the bucket containing `now`
fn window_end(now: DateTime<Utc>, range: TimeRange) -> DateTime<Utc> {
    let width = range.bucket_width().num_seconds();
    let ts = now.timestamp();
    let aligned = ts - ts.rem_euclid(width) + width;
    DateTime::from_timestamp(aligned, 0).unwrap_or(now)
}

/// Metrics reporter
pub struct MetricsReporter {
    source: Arc<dyn TelemetrySource>,
}

impl MetricsReporter {
    /// Create a new reporter
    pub fn new(source: Arc<dyn TelemetrySource>) -> Self {
        Self { source }
    }

    /// Aggregate metrics of `deployment` over `range`, ending now
    pub async fn report(
        &self,
        deployment: &DeploymentRecord,
        range: TimeRange,
    ) -> Result<MetricsReport, DeployError> {
        self.report_until(deployment, range, Utc::now()).await
    }

    /// Aggregate metrics of `deployment` over the `range` window containing `now`
    pub async fn report_until(
        &self,
        deployment: &DeploymentRecord,
        range: TimeRange,
        now: DateTime<Utc>,
    ) -> Result<MetricsReport, DeployError> {
        let timeline = self
            .source
            .fetch(deployment, range, window_end(now, range))
            .await
            .map_err(|e| match e {
                DeployError::ExternalService(_) => e,
                other => DeployError::ExternalService(other.to_string()),
            })?;

        if timeline.len() != range.bucket_count() {
            return Err(DeployError::ExternalService(format!(
                "telemetry returned {} buckets, expected {}",
                timeline.len(),
                range.bucket_count()
            )));
        }

        Ok(aggregate(deployment, range, timeline))
    }
}

fn aggregate(
    deployment: &DeploymentRecord,
    range: TimeRange,
    timeline: Vec<MetricsBucket>,
) -> MetricsReport {
    let requests: u64 = timeline.iter().map(|b| b.requests).sum();
    let bandwidth = timeline.iter().map(|b| b.bandwidth).sum();
    let errors = timeline.iter().map(|b| b.errors).sum();

    let response_time = if requests > 0 {
        timeline
            .iter()
            .map(|b| b.response_time * b.requests as f64)
            .sum::<f64>()
            / requests as f64
    } else {
        0.0
    };

    let uptime = if timeline.is_empty() {
        0.0
    } else {
        timeline.iter().map(|b| b.uptime).sum::<f64>() / timeline.len() as f64
    };

    MetricsReport {
        project_id: deployment.project_id.clone(),
        deployment_id: deployment.id.clone(),
        time_range: range,
        requests,
        bandwidth,
        errors,
        response_time,
        uptime,
        timeline,
    }
}
