//! Probe state machine and the composite report.
//!
//! # States
//! ```text
//! NotRun → Running → Healthy
//!                  → Unhealthy
//! ```
//! A finished probe may be started again on the next report; any other
//! transition is refused.
//!
//! The configuration probe has a third outcome, `NotConfigured`, which is
//! reported but never counted against the overall status.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeState {
    NotRun,
    Running,
    Healthy,
    Unhealthy,
}

impl ProbeState {
    pub fn can_transition_to(self, next: ProbeState) -> bool {
        use ProbeState::*;
        matches!(
            (self, next),
            (NotRun, Running)
                | (Running, Healthy)
                | (Running, Unhealthy)
                | (Healthy, Running)
                | (Unhealthy, Running)
        )
    }
}

/// Result of one probe as it appears in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub status: ProbeStatus,
    pub detail: String,
    /// Probe-specific fields (block number, store clock, address).
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl ProbeResult {
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Healthy,
            detail: detail.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Unhealthy,
            detail: detail.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn not_configured(detail: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::NotConfigured,
            detail: detail.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ProbeStatus::Healthy
    }

    /// Terminal state this result leaves the probe in.
    pub fn final_state(&self) -> ProbeState {
        match self.status {
            ProbeStatus::Unhealthy => ProbeState::Unhealthy,
            ProbeStatus::Healthy | ProbeStatus::NotConfigured => ProbeState::Healthy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceReports {
    pub ledger: ProbeResult,
    pub database: ProbeResult,
    pub contract: ProbeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    /// Unix milliseconds when the report was assembled.
    pub timestamp: u64,
    pub services: ServiceReports,
}

impl HealthReport {
    /// Merge probe results. Only the ledger and store decide the overall status.
    pub fn merge(ledger: ProbeResult, database: ProbeResult, contract: ProbeResult, timestamp: u64) -> Self {
        let status = if ledger.is_healthy() && database.is_healthy() {
            OverallStatus::Ok
        } else {
            OverallStatus::Degraded
        };

        Self {
            status,
            timestamp,
            services: ServiceReports {
                ledger,
                database,
                contract,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == OverallStatus::Ok
    }
}
