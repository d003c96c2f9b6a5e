// ============================================
// Lead Session
// ============================================
//
// Owner of one lead table:
// ┌──────────┐  load   ┌──────────┐ snapshot ┌────────────────┐
// │  caller  │ ──────▶ │ LeadBook │ ───────▶ │ ScoreReconciler│ (spawned task)
// └──────────┘         └──────────┘          └───────┬────────┘
//       ▲  view             ▲   ScoreUpdate (gen-tagged) │
//       └── ViewBuilder ◀───┴────────── mpsc ◀───────────┘
//
// The book is never shared: background passes only send updates, and the
// session applies them on its own schedule (drain / view / wait).

use crate::clients::{RecordStore, Scorer};
use crate::models::{Generation, LeadRecord, ScoreUpdate};
use crate::services::book::LeadBook;
use crate::services::reconciler::{ReconcileReport, ScoreReconciler};
use crate::services::view::{PageView, ViewBuilder, ViewSpec};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct InFlightPass {
    generation: Generation,
    handle: JoinHandle<ReconcileReport>,
}

pub struct LeadSession<S: Scorer + 'static, R: RecordStore + 'static> {
    book: LeadBook,
    views: ViewBuilder,
    reconciler: Arc<ScoreReconciler<S, R>>,
    updates_tx: UnboundedSender<ScoreUpdate>,
    updates_rx: UnboundedReceiver<ScoreUpdate>,
    in_flight: Option<InFlightPass>,
    auto_reconcile: bool,
}

impl<S: Scorer + 'static, R: RecordStore + 'static> LeadSession<S, R> {
    pub fn new(reconciler: ScoreReconciler<S, R>) -> Self {
        let (updates_tx, updates_rx) = unbounded_channel();
        Self {
            book: LeadBook::new(),
            views: ViewBuilder::new(),
            reconciler: Arc::new(reconciler),
            updates_tx,
            updates_rx,
            in_flight: None,
            auto_reconcile: true,
        }
    }

    /// Disable the background pass that normally follows every load.
    pub fn without_auto_reconcile(mut self) -> Self {
        self.auto_reconcile = false;
        self
    }

    pub fn book(&self) -> &LeadBook {
        &self.book
    }

    pub fn generation(&self) -> Generation {
        self.book.generation()
    }

    /// Replace the full record set and start a reconciliation pass for it.
    ///
    /// A pass still running for the previous generation is aborted; any update it
    /// already queued is discarded.
    pub fn load(&mut self, records: Vec<LeadRecord>) -> Generation {
        // Updates already queued belong to the outgoing generation.
        self.drain_updates();

        let generation = self.book.load(records);
        if self.auto_reconcile {
            self.reconcile();
        }
        generation
    }

    /// Start a pass over the current generation unless one is already running for it.
    ///
    /// A running pass for an older generation is aborted, and the new pass waits for
    /// it to be torn down, so at most one pass talks to the scorer at a time.
    /// Returns whether a new pass was started.
    pub fn reconcile(&mut self) -> bool {
        let generation = self.book.generation();

        if let Some(pass) = &self.in_flight {
            if pass.generation == generation && !pass.handle.is_finished() {
                debug!(%generation, "Reconciliation already running for current generation");
                return false;
            }
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(%generation, "No async runtime available, reconciliation not started");
            return false;
        };

        let superseded = match self.in_flight.take() {
            Some(pass) if !pass.handle.is_finished() => {
                info!(
                    superseded = %pass.generation,
                    current = %generation,
                    "Aborting reconciliation pass superseded by newer load"
                );
                pass.handle.abort();
                Some(pass.handle)
            }
            _ => None,
        };

        let snapshot = self.book.snapshot();
        let reconciler = self.reconciler.clone();
        let updates = self.updates_tx.clone();
        let handle = runtime.spawn(async move {
            if let Some(previous) = superseded {
                // Resolves once the aborted task has been dropped.
                let _ = previous.await;
            }
            reconciler.reconcile(&snapshot, &updates).await
        });

        self.in_flight = Some(InFlightPass { generation, handle });
        true
    }

    pub fn is_reconciling(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|pass| !pass.handle.is_finished())
    }

    /// Apply every queued score update. Returns how many changed the current set.
    pub fn drain_updates(&mut self) -> usize {
        let mut queued = Vec::new();
        while let Ok(update) = self.updates_rx.try_recv() {
            queued.push(update);
        }
        if queued.is_empty() {
            return 0;
        }
        self.book.apply_updates(queued)
    }

    /// Wait for the latest pass to finish, then apply its updates.
    ///
    /// Returns `None` when no pass was started or the task did not complete.
    pub async fn wait_for_reconcile(&mut self) -> Option<ReconcileReport> {
        let pass = self.in_flight.take()?;

        let report = match pass.handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(generation = %pass.generation, error = %e, "Reconciliation task failed");
                None
            }
        };

        let applied = self.drain_updates();
        debug!(applied, "Applied score updates after reconciliation");
        report
    }

    /// Current page of the derived view, including any scores received so far.
    pub fn view(&mut self, spec: &ViewSpec, page: usize, page_size: usize) -> PageView {
        self.drain_updates();
        self.views.get_view(&self.book, spec, page, page_size)
    }
}
