//! Request loop
//!
//! Single logical thread of control: one input is processed to completion,
//! outputs included, before the next one is requested.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  Rollup host (HTTP)                  │
//! └──────────────┬───────────────────────▲───────────────┘
//!                │ /finish → input       │ /notice /report /voucher
//!                ▼                       │
//! ┌──────────────────────────────────────┴───────────────┐
//! │                RequestLoop (one task)                │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ checkpoint → Router::handle → emit → commit    │  │
//! │  │ 202: sleep(backoff) or cancelled               │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                       │                              │
//! │                       ▼                              │
//! │            Ledger (owned, &mut per request)          │
//! └──────────────────────────────────────────────────────┘
//! ```

use crate::{
    config::{Config, EmitFailurePolicy},
    host::{NextRequest, RollupHost},
    ledger::Ledger,
    metrics::Metrics,
    router::Router,
    types::{InputEnvelope, Output, Status},
    Result,
};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Drives the host exchange and owns the ledger
pub struct RequestLoop<H: RollupHost> {
    /// Host connector
    host: H,

    /// Input dispatcher
    router: Router,

    /// Balances, owned for the process lifetime
    ledger: Ledger,

    /// Handling of failed output calls
    emit_policy: EmitFailurePolicy,

    /// Wait after an idle poll
    backoff: Duration,

    /// Metrics collector
    metrics: Metrics,

    /// Stops the loop at the next iteration
    shutdown: CancellationToken,
}

impl<H: RollupHost> RequestLoop<H> {
    /// Create a loop with an empty ledger
    pub fn new(host: H, config: &Config, metrics: Metrics) -> Self {
        Self::with_ledger(host, config, metrics, Ledger::new())
    }

    /// Create a loop around an existing ledger
    pub fn with_ledger(host: H, config: &Config, metrics: Metrics, ledger: Ledger) -> Self {
        Self {
            host,
            router: Router::new(&config.deposit),
            ledger,
            emit_policy: config.host.emit_failure_policy,
            backoff: config.polling.backoff(),
            metrics,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`RequestLoop::run`] when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Current ledger
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Host connector
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Poll the host and process inputs until the shutdown token is cancelled
    pub async fn run(&mut self) -> Result<()> {
        info!(backoff_ms = self.backoff.as_millis() as u64, "Request loop started");

        let mut status = Status::Accept;
        while !self.shutdown.is_cancelled() {
            status = self.step(status).await;
        }

        info!(accounts = self.ledger.len(), "Request loop stopped");
        Ok(())
    }

    /// One `/finish` exchange, returning the status for the next one
    pub async fn step(&mut self, status: Status) -> Status {
        match self.host.finish(status).await {
            Ok(NextRequest::Idle) => {
                debug!("No pending input");
                self.metrics.record_idle_poll();
                self.pause().await;
                status
            }
            Ok(NextRequest::Ready(input)) => self.process(input).await,
            Ok(NextRequest::Invalid(reason)) => {
                warn!(%reason, "Host sent an unreadable request");
                let report = [Output::Report(format!("Error: {reason}"))];
                if let Err(e) = self.emit_all(&report).await {
                    warn!(error = %e, "Failed to report unreadable request");
                }
                self.metrics.record_input("invalid", Status::Reject.as_str());
                Status::Reject
            }
            Err(e) => {
                warn!(error = %e, "Finish exchange failed, retrying");
                self.metrics.record_host_error();
                self.pause().await;
                status
            }
        }
    }

    /// Route one input, send its outputs and settle the ledger journal
    pub async fn process(&mut self, input: InputEnvelope) -> Status {
        let span = info_span!(
            "input",
            kind = %input.kind,
            input_index = input.metadata.input_index,
            sender = ?input.sender,
        );

        async {
            let checkpoint = self.ledger.checkpoint();
            let outcome = self.router.handle(&mut self.ledger, &input);
            let mut status = outcome.status;

            if let Err(e) = self.emit_all(&outcome.outputs).await {
                warn!(error = %e, "Output rejected by host, reverting input");
                self.ledger.rollback(checkpoint);
                status = Status::Reject;
            }
            self.ledger.commit();

            self.metrics.record_input(&input.kind.to_string(), status.as_str());
            self.metrics.update_accounts(self.ledger.len());
            info!(%status, outputs = outcome.outputs.len(), "Input processed");
            status
        }
        .instrument(span)
        .await
    }

    /// Send outputs in order.
    ///
    /// Under [`EmitFailurePolicy::Log`] every output is attempted and failures
    /// are only logged; under [`EmitFailurePolicy::Propagate`] the first failure
    /// is returned.
    async fn emit_all(&self, outputs: &[Output]) -> Result<()> {
        for output in outputs {
            if let Err(e) = self.emit(output).await {
                match self.emit_policy {
                    EmitFailurePolicy::Log => warn!(error = %e, "Failed to send output"),
                    EmitFailurePolicy::Propagate => return Err(e),
                }
            }
        }
        Ok(())
    }

    async fn emit(&self, output: &Output) -> Result<()> {
        let (name, result) = match output {
            Output::Notice(text) => ("notice", self.host.notice(text).await),
            Output::Report(text) => ("report", self.host.report(text).await),
            Output::Voucher {
                destination,
                amount,
            } => ("voucher", self.host.voucher(*destination, *amount).await),
        };

        match &result {
            Ok(()) => self.metrics.record_output(name),
            Err(_) => self.metrics.record_emit_failure(),
        }
        result
    }

    async fn pause(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.backoff) => {}
            _ = self.shutdown.cancelled() => {}
        }
    }
}
