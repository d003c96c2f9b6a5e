// ============================================
// Background Jobs Module
// ============================================
//
// Contains background job runners for:
// 1. Lead probability reconciliation
//
// These jobs can be triggered via:
// - CronJob (Kubernetes) with RECONCILE_RUN_ONCE=true
// - Long-running process with RECONCILE_RUN_ONCE=false

pub mod reconcile_job;

pub use reconcile_job::{run_reconcile_job, ReconcileJob};
