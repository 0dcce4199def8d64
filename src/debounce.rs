// src/debounce.rs
//! Input stage: drop consecutive duplicate selections, then only let a
//! selection through once input has been quiet for the configured period.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::model::Selection;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Clock-injected dedup + debounce state.
/// - A selection equal to the previously *offered* one is ignored and does not
///   restart the timer.
/// - Any other selection replaces the pending one and restarts the timer.
#[derive(Debug, Clone)]
pub struct DedupDebounce {
    quiet: Duration,
    last_offered: Option<Selection>,
    pending: Option<(Selection, Instant)>,
}

impl DedupDebounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last_offered: None,
            pending: None,
        }
    }

    /// Returns false when `sel` was dropped as a duplicate.
    pub fn offer(&mut self, sel: Selection, now: Instant) -> bool {
        if self.last_offered.as_ref() == Some(&sel) {
            return false;
        }
        self.last_offered = Some(sel.clone());
        self.pending = Some((sel, now + self.quiet));
        true
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at)
    }

    /// Pops the pending selection if its quiet period has elapsed at `now`.
    pub fn take_ready(&mut self, now: Instant) -> Option<Selection> {
        match &self.pending {
            Some((_, at)) if *at <= now => self.pending.take().map(|(sel, _)| sel),
            _ => None,
        }
    }
}

/// Run the stage on a task. Pending input is discarded when `input` closes.
pub fn spawn_debouncer(
    mut input: mpsc::UnboundedReceiver<Selection>,
    quiet: Duration,
) -> (mpsc::UnboundedReceiver<Selection>, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        let mut stage = DedupDebounce::new(quiet);
        loop {
            let deadline = stage.deadline();
            tokio::select! {
                maybe = input.recv() => match maybe {
                    Some(sel) => {
                        if !stage.offer(sel, Instant::now()) {
                            tracing::trace!(target: "debounce", "duplicate selection dropped");
                        }
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(sel) = stage.take_ready(Instant::now()) {
                        tracing::debug!(target: "debounce", selection = %sel, "selection settled");
                        if tx.send(sel).is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });
    (rx, handle)
}
