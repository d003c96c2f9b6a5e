pub mod book;
pub mod filter;
pub mod ranking;
pub mod reconciler;
pub mod session;
pub mod sort;
pub mod view;

pub use book::LeadBook;
pub use filter::FilterSpec;
pub use ranking::assign_ranks;
pub use reconciler::{ReconcileReport, ScoreReconciler};
pub use session::LeadSession;
pub use sort::SortSpec;
pub use view::{PageView, ViewBuilder, ViewSpec};
