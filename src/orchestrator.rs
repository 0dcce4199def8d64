// src/orchestrator.rs
//! Fetch orchestrator: the single owner of `PipelineState`.
//!
//! Every debounced selection opens a new epoch. The previous aggregation task
//! is aborted, and any result that still arrives tagged with an older epoch is
//! dropped, so only the newest selection can ever reach the published state.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::aggregate::Aggregator;
use crate::config::DashboardConfig;
use crate::debounce::spawn_debouncer;
use crate::fetch::{FetchClient, FetchError, ReqwestTransport};
use crate::model::{DashboardRecord, HoroscopeReading, ImageOfDay, PipelineState, Selection};
use crate::telemetry::{ensure_metrics_described, AGGREGATIONS_TOTAL, STALE_RESULTS_TOTAL};

type AggregateResult = Result<(ImageOfDay, HoroscopeReading), FetchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dashboard pipeline is closed")]
pub struct PipelineClosed;

/// Text published on `PipelineState::last_error`.
pub fn describe(err: &FetchError) -> String {
    format!("failed to load daily data: {err}")
}

/// Epoch bookkeeping around the state sender. Not shared; lives on the
/// orchestrator task.
pub(crate) struct StateOwner {
    epoch: u64,
    state: watch::Sender<PipelineState>,
}

impl StateOwner {
    pub(crate) fn new(state: watch::Sender<PipelineState>) -> Self {
        Self { epoch: 0, state }
    }

    /// Open a new epoch for `sel`: loading on, error cleared, record kept.
    pub(crate) fn begin(&mut self, sel: &Selection) -> u64 {
        self.epoch += 1;
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.last_error = None;
        });
        tracing::info!(target: "orchestrator", epoch = self.epoch, selection = %sel, "loading");
        self.epoch
    }

    /// Apply a finished aggregation. Returns false if `epoch` was superseded.
    pub(crate) fn complete(&mut self, epoch: u64, result: AggregateResult) -> bool {
        if epoch != self.epoch {
            tracing::debug!(
                target: "orchestrator",
                epoch,
                current = self.epoch,
                ok = result.is_ok(),
                "dropping stale result"
            );
            counter!(STALE_RESULTS_TOTAL).increment(1);
            return false;
        }

        match result {
            Ok((image, horoscope)) => {
                let record = DashboardRecord::from_parts(&image, &horoscope);
                tracing::info!(target: "orchestrator", epoch, title = %record.image_title, "loaded");
                self.state.send_modify(|s| {
                    s.current = Some(record);
                    s.is_loading = false;
                });
            }
            Err(err) => {
                tracing::warn!(target: "orchestrator", epoch, error = %err, "aggregation failed");
                let message = describe(&err);
                // Last good record stays visible next to the error.
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.last_error = Some(message);
                });
            }
        }
        true
    }
}

struct Completion {
    epoch: u64,
    result: AggregateResult,
}

struct Inflight {
    epoch: u64,
    handle: JoinHandle<()>,
}

/// Resolves when the in-flight task ends; never resolves while idle.
async fn task_ended(slot: &mut Option<Inflight>) -> (u64, Result<(), JoinError>) {
    match slot {
        Some(task) => (task.epoch, (&mut task.handle).await),
        None => std::future::pending().await,
    }
}

async fn run_orchestrator(
    aggregator: Aggregator,
    mut settled: mpsc::UnboundedReceiver<Selection>,
    state: watch::Sender<PipelineState>,
) {
    ensure_metrics_described();

    let mut owner = StateOwner::new(state);
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
    let mut inflight: Option<Inflight> = None;

    loop {
        tokio::select! {
            maybe = settled.recv() => {
                let Some(sel) = maybe else { break };
                if let Some(prev) = inflight.take() {
                    prev.handle.abort();
                }
                let epoch = owner.begin(&sel);
                counter!(AGGREGATIONS_TOTAL).increment(1);

                let aggregator = aggregator.clone();
                let done_tx = done_tx.clone();
                let handle = tokio::spawn(async move {
                    let result = aggregator.aggregate(&sel).await;
                    let _ = done_tx.send(Completion { epoch, result });
                });
                inflight = Some(Inflight { epoch, handle });
            }
            Some(done) = done_rx.recv() => {
                owner.complete(done.epoch, done.result);
            }
            (epoch, joined) = task_ended(&mut inflight) => {
                inflight = None;
                // A finished task has already queued its completion. A panicked
                // one never will, so report it here.
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(target: "orchestrator", epoch, "aggregation task panicked");
                        owner.complete(epoch, Err(FetchError::Task("panicked".into())));
                    }
                }
            }
        }
    }

    if let Some(prev) = inflight.take() {
        prev.handle.abort();
    }
    tracing::debug!(target: "orchestrator", "input closed; orchestrator stopped");
}

/// One dashboard session: submit selections, observe `PipelineState`.
pub struct Dashboard {
    input: mpsc::UnboundedSender<Selection>,
    state: watch::Receiver<PipelineState>,
    debouncer: JoinHandle<()>,
    orchestrator: JoinHandle<()>,
}

impl Dashboard {
    /// Spawn the debouncer and orchestrator tasks. Must be called within a Tokio runtime.
    pub fn spawn(aggregator: Aggregator, quiet_period: Duration) -> Self {
        let (input, raw) = mpsc::unbounded_channel();
        let (settled, debouncer) = spawn_debouncer(raw, quiet_period);
        let (state_tx, state) = watch::channel(PipelineState::default());
        let orchestrator = tokio::spawn(run_orchestrator(aggregator, settled, state_tx));
        Self {
            input,
            state,
            debouncer,
            orchestrator,
        }
    }

    /// Production wiring: reqwest transport + configured endpoints.
    pub fn from_config(cfg: &DashboardConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(cfg.timeouts())?;
        let client = FetchClient::new(Arc::new(transport));
        let aggregator = Aggregator::new(client, cfg.endpoints()?);
        Ok(Self::spawn(aggregator, cfg.quiet_period()))
    }

    pub fn submit(&self, sel: Selection) -> Result<(), PipelineClosed> {
        self.input.send(sel).map_err(|_| PipelineClosed)
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    /// Close the input and wait for both tasks. Anything still pending is abandoned.
    pub async fn shutdown(self) {
        let Dashboard {
            input,
            debouncer,
            orchestrator,
            ..
        } = self;
        drop(input);
        if let Err(e) = debouncer.await {
            tracing::warn!(error = %e, "debouncer task ended abnormally");
        }
        if let Err(e) = orchestrator.await {
            tracing::warn!(error = %e, "orchestrator task ended abnormally");
        }
    }
}
