pub mod clients;
pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod utils;

pub use clients::{RecordStore, Scorer};
pub use config::Config;
pub use error::{LeadError, Result};
pub use models::{Generation, LeadRecord, ScoreUpdate};
pub use services::{
    FilterSpec, LeadBook, LeadSession, PageView, ScoreReconciler, SortSpec, ViewBuilder, ViewSpec,
};
