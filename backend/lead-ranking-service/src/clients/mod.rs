// ============================================
// External Collaborators
// ============================================
// The record store owns persistence and pagination; the scorer owns the
// conversion model. Both are opaque to the engine and injected as traits.

pub mod http_scorer;
pub mod http_store;

pub use http_scorer::HttpScorer;
pub use http_store::HttpRecordStore;

use crate::error::Result;
use crate::models::{FeatureVector, LeadRecord};
use crate::services::filter::FilterSpec;
use async_trait::async_trait;
use tracing::{debug, info};

/// Page request forwarded to the record store
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub filters: Option<FilterSpec>,
}

impl PageQuery {
    pub fn page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            search: None,
            filters: None,
        }
    }
}

/// One page of records as returned by the store
#[derive(Debug, Clone, Default)]
pub struct LeadPage {
    pub records: Vec<LeadRecord>,
    pub total_pages: u32,
    pub total_items: u64,
}

/// Record store capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one page of lead records
    async fn fetch_page(&self, query: &PageQuery) -> Result<LeadPage>;

    /// Persist a computed probability for a record
    async fn update_probability(&self, id: &str, probability: f64) -> Result<()>;
}

/// Conversion scorer capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Predict the conversion probability (0-100) for one feature vector
    async fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

/// Walk every page of the store and return the full record set in store order.
pub async fn load_full_set<S: RecordStore + ?Sized>(
    store: &S,
    page_size: u32,
) -> Result<Vec<LeadRecord>> {
    let page_size = page_size.max(1);
    let mut records = Vec::new();
    let mut page = 1;

    loop {
        let batch = store.fetch_page(&PageQuery::page(page, page_size)).await?;
        let received = batch.records.len();
        records.extend(batch.records);

        debug!(page, received, total_pages = batch.total_pages, "Fetched lead page");

        // An empty page also ends the walk, in case the store under-reports totals.
        if page >= batch.total_pages || received == 0 {
            break;
        }
        page += 1;
    }

    info!(record_count = records.len(), "Loaded full lead set");
    Ok(records)
}

/// In-memory record store for local runs
#[derive(Debug, Default)]
pub struct StubRecordStore {
    records: Vec<LeadRecord>,
}

impl StubRecordStore {
    pub fn new(records: Vec<LeadRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordStore for StubRecordStore {
    async fn fetch_page(&self, query: &PageQuery) -> Result<LeadPage> {
        let page_size = query.page_size.max(1) as usize;
        let start = (query.page.max(1) as usize - 1) * page_size;
        let records = self
            .records
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();

        Ok(LeadPage {
            records,
            total_pages: crate::utils::page_count(self.records.len(), page_size) as u32,
            total_items: self.records.len() as u64,
        })
    }

    async fn update_probability(&self, _id: &str, _probability: f64) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LeadError;

    fn leads(n: usize) -> Vec<LeadRecord> {
        (0..n)
            .map(|i| LeadRecord::new(format!("C-{:03}", i), format!("Lead {}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_load_full_set_walks_all_pages() {
        let store = StubRecordStore::new(leads(23));

        let records = load_full_set(&store, 10).await.unwrap();

        assert_eq!(records.len(), 23);
        assert_eq!(records[0].id, "C-000");
        assert_eq!(records[22].id, "C-022");
    }

    #[tokio::test]
    async fn test_load_full_set_propagates_fetch_errors() {
        let mut store = MockRecordStore::new();
        store
            .expect_fetch_page()
            .times(1)
            .returning(|_| Err(LeadError::StoreFetch("connection refused".to_string())));

        let result = load_full_set(&store, 10).await;
        assert!(matches!(result, Err(LeadError::StoreFetch(_))));
    }

    #[tokio::test]
    async fn test_load_full_set_stops_on_empty_page() {
        let mut store = MockRecordStore::new();
        store.expect_fetch_page().times(1).returning(|_| {
            Ok(LeadPage {
                records: Vec::new(),
                total_pages: 50,
                total_items: 500,
            })
        });

        assert!(load_full_set(&store, 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_stub_store_last_page_is_partial() {
        let store = StubRecordStore::new(leads(23));

        let page = tokio_test::block_on(store.fetch_page(&PageQuery::page(3, 10))).unwrap();

        assert_eq!(page.records.len(), 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 23);
    }
}
