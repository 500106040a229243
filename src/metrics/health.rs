use serde::{Deserialize, Serialize};

use super::endpoint::EndpointSummary;

/// Coarse verdict shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

/// Tunable limits behind the verdict. All comparisons are strict `>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Error rate (0..=1) above which the system is degraded
    pub error_rate_warning: f64,
    /// Error rate (0..=1) above which the system is critical
    pub error_rate_critical: f64,
    /// Recent per-endpoint mean (ms) above which the system is degraded
    pub latency_warning_ms: f64,
    /// Recent per-endpoint mean (ms) above which the system is critical
    pub latency_critical_ms: f64,
    /// Error rate is not judged until this many requests were seen
    pub min_requests: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            error_rate_warning: 0.05,
            error_rate_critical: 0.10,
            latency_warning_ms: 1000.0,
            latency_critical_ms: 3000.0,
            min_requests: 0,
        }
    }
}

/// The verdict plus the numbers that drove it.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub slowest_endpoint: Option<String>,
    pub slowest_recent_avg_ms: f64,
    pub reasons: Vec<String>,
    pub thresholds: HealthThresholds,
}

impl HealthThresholds {
    pub fn evaluate(
        &self,
        total_requests: u64,
        total_errors: u64,
        endpoints: &[EndpointSummary],
    ) -> HealthReport {
        let error_rate = error_rate(total_requests, total_errors);

        let slowest = endpoints
            .iter()
            .max_by(|a, b| a.recent_avg_ms.total_cmp(&b.recent_avg_ms));
        let slowest_recent_avg_ms = slowest.map(|e| e.recent_avg_ms).unwrap_or(0.0);

        let mut status = HealthStatus::Healthy;
        let mut reasons = Vec::new();

        if total_requests >= self.min_requests {
            if error_rate > self.error_rate_critical {
                status = status.max(HealthStatus::Critical);
                reasons.push(format!(
                    "error rate {:.3} above critical {:.3}",
                    error_rate, self.error_rate_critical
                ));
            } else if error_rate > self.error_rate_warning {
                status = status.max(HealthStatus::Degraded);
                reasons.push(format!(
                    "error rate {:.3} above warning {:.3}",
                    error_rate, self.error_rate_warning
                ));
            }
        }

        if let Some(endpoint) = slowest {
            let label = format!("{} {}", endpoint.method, endpoint.path);
            if slowest_recent_avg_ms > self.latency_critical_ms {
                status = status.max(HealthStatus::Critical);
                reasons.push(format!(
                    "{label} recent avg {slowest_recent_avg_ms:.1}ms above critical {:.1}ms",
                    self.latency_critical_ms
                ));
            } else if slowest_recent_avg_ms > self.latency_warning_ms {
                status = status.max(HealthStatus::Degraded);
                reasons.push(format!(
                    "{label} recent avg {slowest_recent_avg_ms:.1}ms above warning {:.1}ms",
                    self.latency_warning_ms
                ));
            }
        }

        HealthReport {
            status,
            total_requests,
            total_errors,
            error_rate,
            slowest_endpoint: slowest.map(|e| format!("{} {}", e.method, e.path)),
            slowest_recent_avg_ms,
            reasons,
            thresholds: self.clone(),
        }
    }
}

pub(crate) fn error_rate(total_requests: u64, total_errors: u64) -> f64 {
    if total_requests == 0 {
        0.0
    } else {
        total_errors as f64 / total_requests as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(recent_avg_ms: f64) -> EndpointSummary {
        EndpointSummary {
            method: "GET".into(),
            path: "/projects".into(),
            count: 10,
            errors: 0,
            avg_ms: recent_avg_ms,
            min_ms: recent_avg_ms,
            max_ms: recent_avg_ms,
            recent_avg_ms,
            p50_ms: recent_avg_ms,
            p95_ms: recent_avg_ms,
            p99_ms: recent_avg_ms,
        }
    }

    #[test]
    fn no_traffic_is_healthy() {
        let report = HealthThresholds::default().evaluate(0, 0, &[]);
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.error_rate, 0.0);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn error_rate_drives_transitions() {
        let t = HealthThresholds::default();
        let fast = [endpoint(20.0)];

        assert_eq!(t.evaluate(100, 0, &fast).status, HealthStatus::Healthy);
        assert_eq!(t.evaluate(100, 7, &fast).status, HealthStatus::Degraded);
        assert_eq!(t.evaluate(100, 25, &fast).status, HealthStatus::Critical);
    }

    #[test]
    fn latency_drives_transitions() {
        let t = HealthThresholds::default();

        assert_eq!(t.evaluate(10, 0, &[endpoint(999.0)]).status, HealthStatus::Healthy);
        assert_eq!(t.evaluate(10, 0, &[endpoint(1500.0)]).status, HealthStatus::Degraded);

        let report = t.evaluate(10, 0, &[endpoint(50.0), endpoint(3500.0)]);
        assert_eq!(report.status, HealthStatus::Critical);
        assert_eq!(report.slowest_recent_avg_ms, 3500.0);
    }

    #[test]
    fn worst_signal_wins() {
        let t = HealthThresholds::default();
        let report = t.evaluate(100, 20, &[endpoint(1500.0)]);
        assert_eq!(report.status, HealthStatus::Critical);
        assert_eq!(report.reasons.len(), 2);
    }

    #[test]
    fn min_requests_suppresses_cold_start_errors() {
        let t = HealthThresholds {
            min_requests: 20,
            ..HealthThresholds::default()
        };
        assert_eq!(t.evaluate(2, 1, &[]).status, HealthStatus::Healthy);
        assert_eq!(t.evaluate(20, 10, &[]).status, HealthStatus::Critical);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
