//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the request loop.
//!
//! # Metrics
//!
//! - `rollup_inputs_total{kind,status}` - Inputs processed, by request kind and status
//! - `rollup_outputs_total{output}` - Notices, reports and vouchers accepted by the host
//! - `rollup_emit_failures_total` - Output calls the host did not accept
//! - `rollup_idle_polls_total` - `/finish` answers with no pending input
//! - `rollup_host_errors_total` - Failed `/finish` exchanges
//! - `rollup_accounts` - Accounts known to the ledger

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Inputs by kind and status
    pub inputs_total: IntCounterVec,

    /// Outputs by type
    pub outputs_total: IntCounterVec,

    /// Output calls that failed
    pub emit_failures: IntCounter,

    /// Polls that returned no input
    pub idle_polls: IntCounter,

    /// Failed `/finish` exchanges
    pub host_errors: IntCounter,

    /// Known accounts
    pub accounts: IntGauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let inputs_total = IntCounterVec::new(
            Opts::new("rollup_inputs_total", "Inputs processed"),
            &["kind", "status"],
        )?;
        registry.register(Box::new(inputs_total.clone()))?;

        let outputs_total = IntCounterVec::new(
            Opts::new("rollup_outputs_total", "Outputs accepted by the host"),
            &["output"],
        )?;
        registry.register(Box::new(outputs_total.clone()))?;

        let emit_failures = IntCounter::new(
            "rollup_emit_failures_total",
            "Output calls the host did not accept",
        )?;
        registry.register(Box::new(emit_failures.clone()))?;

        let idle_polls = IntCounter::new(
            "rollup_idle_polls_total",
            "Finish calls answered with no pending input",
        )?;
        registry.register(Box::new(idle_polls.clone()))?;

        let host_errors = IntCounter::new(
            "rollup_host_errors_total",
            "Failed finish exchanges",
        )?;
        registry.register(Box::new(host_errors.clone()))?;

        let accounts = IntGauge::new("rollup_accounts", "Accounts known to the ledger")?;
        registry.register(Box::new(accounts.clone()))?;

        Ok(Self {
            inputs_total,
            outputs_total,
            emit_failures,
            idle_polls,
            host_errors,
            accounts,
            registry,
        })
    }

    /// Record a processed input
    pub fn record_input(&self, kind: &str, status: &str) {
        self.inputs_total.with_label_values(&[kind, status]).inc();
    }

    /// Record an output the host accepted
    pub fn record_output(&self, output: &str) {
        self.outputs_total.with_label_values(&[output]).inc();
    }

    /// Record a failed output call
    pub fn record_emit_failure(&self) {
        self.emit_failures.inc();
    }

    /// Record an idle poll
    pub fn record_idle_poll(&self) {
        self.idle_polls.inc();
    }

    /// Record a failed finish exchange
    pub fn record_host_error(&self) {
        self.host_errors.inc();
    }

    /// Update account count
    pub fn update_accounts(&self, count: usize) {
        self.accounts.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the text exposition format
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
