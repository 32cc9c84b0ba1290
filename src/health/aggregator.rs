//! Fan-out/fan-in of the dependency probes.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use dashmap::DashMap;
use tokio::time;

use crate::audit::store::{now_millis, AuditStore};
use crate::blockchain::client::LedgerClient;
use crate::health::probes::{ContractProbe, LedgerProbe, Probe, StoreProbe};
use crate::health::state::{HealthReport, ProbeResult, ProbeState};
use crate::observability::metrics;

pub struct HealthAggregator {
    ledger: Arc<dyn Probe>,
    store: Arc<dyn Probe>,
    contract: Arc<dyn Probe>,
    probe_timeout: Duration,
    states: DashMap<&'static str, ProbeState>,
}

impl HealthAggregator {
    pub fn new(
        ledger: Arc<dyn Probe>,
        store: Arc<dyn Probe>,
        contract: Arc<dyn Probe>,
        probe_timeout: Duration,
    ) -> Self {
        let states = DashMap::new();
        for probe in [&ledger, &store, &contract] {
            states.insert(probe.name(), ProbeState::NotRun);
        }

        Self {
            ledger,
            store,
            contract,
            probe_timeout,
            states,
        }
    }

    /// Aggregator over the standard ledger, store and contract probes.
    pub fn for_dependencies(
        ledger: Arc<dyn LedgerClient>,
        network_id: u64,
        store: Arc<dyn AuditStore>,
        contract: Option<Address>,
        probe_timeout: Duration,
    ) -> Self {
        Self::new(
            Arc::new(LedgerProbe::new(ledger, network_id)),
            Arc::new(StoreProbe::new(store)),
            Arc::new(ContractProbe::new(contract)),
            probe_timeout,
        )
    }

    /// Last known state of the named probe.
    pub fn probe_state(&self, name: &str) -> Option<ProbeState> {
        self.states.get(name).map(|s| *s)
    }

    /// Run every probe concurrently and merge the results.
    ///
    /// Never fails: a probe that errors, panics or overruns its deadline is
    /// reported unhealthy and the others still complete.
    pub async fn report(&self) -> HealthReport {
        let (ledger, store, contract) = tokio::join!(
            self.run_probe(self.ledger.clone()),
            self.run_probe(self.store.clone()),
            self.run_probe(self.contract.clone()),
        );

        let report = HealthReport::merge(ledger, store, contract, now_millis());
        if !report.is_ok() {
            tracing::warn!(
                ledger = %report.services.ledger.detail,
                database = %report.services.database.detail,
                "Health degraded"
            );
        }
        report
    }

    async fn run_probe(&self, probe: Arc<dyn Probe>) -> ProbeResult {
        let name = probe.name();
        self.transition(name, ProbeState::Running);

        let mut handle = tokio::spawn(async move { probe.check().await });
        let result = match time::timeout(self.probe_timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(probe = name, error = %e, "Probe task failed");
                ProbeResult::unhealthy(format!("probe failed: {}", e))
            }
            Err(_) => {
                handle.abort();
                tracing::warn!(probe = name, timeout_ms = self.probe_timeout.as_millis() as u64, "Probe timed out");
                ProbeResult::unhealthy(format!(
                    "probe timed out after {}ms",
                    self.probe_timeout.as_millis()
                ))
            }
        };

        self.transition(name, result.final_state());
        metrics::record_probe_health(name, result.final_state() == ProbeState::Healthy);
        result
    }

    fn transition(&self, name: &'static str, next: ProbeState) {
        let mut state = self.states.entry(name).or_insert(ProbeState::NotRun);
        if state.can_transition_to(next) {
            *state = next;
        } else {
            tracing::debug!(probe = name, from = ?*state, to = ?next, "Ignored probe transition");
        }
    }
}
