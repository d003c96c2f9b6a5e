// ============================================
// Score Reconciler
// ============================================
//
// Background pass that fills in missing conversion probabilities.
//
// Workflow:
// 1. Select records of the snapshot with no probability
// 2. For each one, strictly one at a time:
//    build features → scorer → persist to store → emit generation-tagged update
// 3. Any failure is logged and counted; the record stays pending for the next pass
//
// The pass never touches the in-memory set directly. Updates go to the owner,
// which drops them if a newer generation has been loaded in the meantime.

use crate::clients::{RecordStore, Scorer};
use crate::error::{LeadError, Result};
use crate::models::{FeatureVector, Generation, LeadRecord, ScoreUpdate};
use crate::services::book::RecordSnapshot;
use crate::utils::is_valid_probability;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// Reconciliation pass configuration
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Pause between consecutive scorer calls (to avoid overloading the scorer)
    pub call_delay_ms: u64,
    /// Maximum number of records scored in one pass (0 = unlimited)
    pub max_records_per_pass: usize,
    /// Upper bound for a single scorer call
    pub scorer_timeout: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            call_delay_ms: 0,
            max_records_per_pass: 0,
            scorer_timeout: Duration::from_secs(10),
        }
    }
}

/// Reconciliation pass statistics
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub generation: Generation,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Pending records found in the snapshot
    pub selected: u32,
    /// Pending records left for a later pass because of `max_records_per_pass`
    pub deferred: u32,
    pub scored: u32,
    pub scoring_failures: u32,
    pub store_failures: u32,
    pub total_duration_ms: u64,
}

impl ReconcileReport {
    pub fn failures(&self) -> u32 {
        self.scoring_failures + self.store_failures
    }
}

pub struct ScoreReconciler<S: Scorer, R: RecordStore> {
    scorer: Arc<S>,
    store: Arc<R>,
    config: ReconcileConfig,
}

impl<S: Scorer, R: RecordStore> ScoreReconciler<S, R> {
    pub fn new(scorer: Arc<S>, store: Arc<R>, config: ReconcileConfig) -> Self {
        Self {
            scorer,
            store,
            config,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run one pass over `snapshot`, sending every persisted score to `updates`.
    ///
    /// Never fails: per-record errors are isolated and reported in the statistics.
    pub async fn reconcile(
        &self,
        snapshot: &RecordSnapshot,
        updates: &UnboundedSender<ScoreUpdate>,
    ) -> ReconcileReport {
        let start_time = Instant::now();
        let mut report = ReconcileReport {
            generation: snapshot.generation,
            ..Default::default()
        };

        let pending: Vec<&LeadRecord> = snapshot.pending().collect();
        report.selected = pending.len() as u32;

        if pending.is_empty() {
            debug!(generation = %snapshot.generation, "No pending leads, skipping reconciliation");
            return report;
        }

        let limit = match self.config.max_records_per_pass {
            0 => pending.len(),
            max => max.min(pending.len()),
        };
        report.deferred = (pending.len() - limit) as u32;
        report.started_at = Some(Utc::now());

        info!(
            generation = %snapshot.generation,
            pending = pending.len(),
            limit,
            "Starting reconciliation pass"
        );

        for (position, record) in pending.into_iter().take(limit).enumerate() {
            if position > 0 && self.config.call_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.call_delay_ms)).await;
            }

            let probability = match self.score(record).await {
                Ok(probability) => probability,
                Err(e) => {
                    report.scoring_failures += 1;
                    warn!(
                        id = %record.id,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Scoring failed, lead stays pending"
                    );
                    continue;
                }
            };

            if let Err(e) = self.store.update_probability(&record.id, probability).await {
                report.store_failures += 1;
                warn!(
                    id = %record.id,
                    probability,
                    error = %e,
                    "Failed to persist probability, lead stays pending"
                );
                continue;
            }

            report.scored += 1;
            debug!(id = %record.id, probability, "Lead scored");

            let update = ScoreUpdate {
                generation: snapshot.generation,
                id: record.id.clone(),
                probability,
            };
            if updates.send(update).is_err() {
                debug!(id = %record.id, "Update receiver closed, score kept in store only");
            }
        }

        report.completed_at = Some(Utc::now());
        report.total_duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            generation = %report.generation,
            selected = report.selected,
            scored = report.scored,
            scoring_failures = report.scoring_failures,
            store_failures = report.store_failures,
            deferred = report.deferred,
            duration_ms = report.total_duration_ms,
            "Reconciliation pass completed"
        );

        report
    }

    /// Score one record, rejecting timeouts and out-of-range predictions.
    async fn score(&self, record: &LeadRecord) -> Result<f64> {
        let features = FeatureVector::from(record);

        let predicted = timeout(self.config.scorer_timeout, self.scorer.predict(&features))
            .await
            .map_err(|_| {
                LeadError::ScoringService(format!(
                    "Scorer timed out after {}ms",
                    self.config.scorer_timeout.as_millis()
                ))
            })??;

        if !is_valid_probability(predicted) {
            return Err(LeadError::ScoringService(format!(
                "Scorer returned invalid probability: {}",
                predicted
            )));
        }

        Ok(predicted)
    }
}
