// ============================================
// Reconcile Job
// ============================================
//
// Background job that keeps lead probabilities filled in.
// Designed to run as a Kubernetes CronJob or standalone process.
//
// Workflow:
// 1. Load the full lead set from the record store (all pages)
// 2. Rank it and start a reconciliation pass for the pending leads
// 3. Wait for the pass, apply the persisted scores and re-rank
// 4. Log pass statistics and the top of the ranked view

use crate::clients::{load_full_set, HttpRecordStore, HttpScorer, RecordStore, Scorer};
use crate::config::{Config, JobConfig};
use crate::error::Result;
use crate::services::reconciler::{ReconcileReport, ScoreReconciler};
use crate::services::session::LeadSession;
use crate::services::view::ViewSpec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

pub struct ReconcileJob<S: Scorer + 'static, R: RecordStore + 'static> {
    config: JobConfig,
    page_size: u32,
    store: Arc<R>,
    session: LeadSession<S, R>,
}

impl<S: Scorer + 'static, R: RecordStore + 'static> ReconcileJob<S, R> {
    pub fn new(
        config: JobConfig,
        page_size: u32,
        store: Arc<R>,
        reconciler: ScoreReconciler<S, R>,
    ) -> Self {
        Self {
            config,
            page_size,
            store,
            session: LeadSession::new(reconciler),
        }
    }

    /// Run passes until `run_once` says stop. Returns the statistics of the last pass.
    pub async fn run(&mut self) -> Result<ReconcileReport> {
        loop {
            let report = match self.run_single_pass().await {
                Ok(report) => report,
                Err(e) if !self.config.run_once => {
                    // Keep serving the previous set; the next interval retries the load.
                    warn!(error = %e, "Reconcile pass failed");
                    ReconcileReport::default()
                }
                Err(e) => return Err(e),
            };

            if self.config.run_once {
                return Ok(report);
            }

            info!(
                interval_secs = self.config.interval_secs,
                "Sleeping until next pass"
            );
            sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    /// Load the current full set, reconcile it and apply the results.
    pub async fn run_single_pass(&mut self) -> Result<ReconcileReport> {
        let records = load_full_set(self.store.as_ref(), self.page_size).await?;
        let generation = self.session.load(records);

        let report = self.session.wait_for_reconcile().await.unwrap_or_else(|| ReconcileReport {
            generation,
            ..Default::default()
        });

        self.log_preview();
        Ok(report)
    }

    fn log_preview(&mut self) {
        if self.config.preview_rows == 0 {
            return;
        }

        let view = self
            .session
            .view(&ViewSpec::default(), 1, self.config.preview_rows);
        info!(
            total_leads = view.total_items,
            pending = self.session.book().pending_count(),
            "Ranked lead view"
        );
        for lead in &view.items {
            info!(
                rank = lead.rank.unwrap_or_default(),
                id = %lead.id,
                name = %lead.name,
                probability = lead.probability.unwrap_or_default(),
                category = %lead.category,
                "Top lead"
            );
        }
    }

    pub fn session(&self) -> &LeadSession<S, R> {
        &self.session
    }
}

/// Build the HTTP-backed job from app config
pub fn from_config(config: &Config) -> Result<ReconcileJob<HttpScorer, HttpRecordStore>> {
    let store = Arc::new(HttpRecordStore::new(
        &config.store.base_url,
        &config.store.api_token,
        Duration::from_secs(config.store.timeout_secs),
    )?);
    let scorer = Arc::new(HttpScorer::new(
        &config.scorer.base_url,
        Duration::from_secs(config.scorer.timeout_secs),
    )?);

    let reconciler = ScoreReconciler::new(scorer, store.clone(), config.reconcile_config());
    Ok(ReconcileJob::new(
        config.job.clone(),
        config.store.page_size,
        store,
        reconciler,
    ))
}

/// Entry point for running the reconcile job as a standalone process
pub async fn run_reconcile_job() -> Result<()> {
    info!("Initializing reconcile job");

    let config = Config::from_env()?;
    info!(
        service = %config.service.service_name,
        store_url = %config.store.base_url,
        scorer_url = %config.scorer.base_url,
        run_once = config.job.run_once,
        "Loaded configuration"
    );

    let mut job = from_config(&config)?;
    let stats = job.run().await?;

    info!(
        generation = %stats.generation,
        selected = stats.selected,
        scored = stats.scored,
        failed = stats.failures(),
        "Reconcile job completed"
    );

    Ok(())
}
