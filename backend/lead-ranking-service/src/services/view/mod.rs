// ============================================
// View Builder
// ============================================
//
// Derived, paginated read over the lead book:
//   full set (already ranked) → filter → sort → page slice
//
// The ordered index list is memoized by (record-set identity, view spec), so
// paging through the same view never re-filters or re-sorts.

use crate::error::{LeadError, Result};
use crate::models::LeadRecord;
use crate::services::book::{LeadBook, RecordSetId};
use crate::services::filter::{filter_indices, FilterSpec};
use crate::services::sort::{sort_indices, SortSpec};
use crate::utils::page_count;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Complete table configuration as sent by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewSpec {
    #[serde(flatten)]
    pub filter: FilterSpec,
    #[serde(flatten)]
    pub sort: SortSpec,
}

impl ViewSpec {
    pub fn validate(&self) -> Result<()> {
        let duplicates = self.sort.duplicate_keys();
        if !duplicates.is_empty() {
            return Err(LeadError::SpecValidation(format!(
                "sort keys listed more than once: {:?}",
                duplicates
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON spec.
    pub fn parse(value: serde_json::Value) -> Result<Self> {
        let spec: ViewSpec = serde_json::from_value(value)
            .map_err(|e| LeadError::SpecValidation(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Like [`ViewSpec::parse`], but a malformed spec degrades to the pass-all default.
    pub fn parse_lenient(value: serde_json::Value) -> Self {
        match Self::parse(value) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(error = %e, "Invalid view spec, falling back to default");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub items: Vec<LeadRecord>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// Zero-based position of the first item of the page in the full view
    pub start_index: usize,
    /// Exclusive end position, clamped to `total_items`
    pub end_index: usize,
}

/// Page size choices for a view of `total` items: 10..=100 by tens, plus "all".
pub fn page_size_options(total: usize) -> Vec<usize> {
    let mut options: Vec<usize> = (10..=100).step_by(10).collect();
    if total > 0 && !options.contains(&total) {
        options.push(total);
    }
    options
}

/// Filter then sort `records`, returning the ordered positions.
pub fn ordered_indices(records: &[LeadRecord], spec: &ViewSpec) -> Vec<usize> {
    let mut indices = filter_indices(records, &spec.filter);
    sort_indices(records, &mut indices, &spec.sort);
    indices
}

struct CachedOrder {
    identity: RecordSetId,
    spec: ViewSpec,
    order: Arc<Vec<usize>>,
}

#[derive(Default)]
pub struct ViewBuilder {
    cache: Option<CachedOrder>,
    hits: u64,
    misses: u64,
}

impl ViewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized filter + sort over the current book content.
    pub fn ordered(&mut self, book: &LeadBook, spec: &ViewSpec) -> Arc<Vec<usize>> {
        let identity = book.identity();

        if let Some(cached) = &self.cache {
            if cached.identity == identity && cached.spec == *spec {
                self.hits += 1;
                return cached.order.clone();
            }
        }

        self.misses += 1;
        let order = Arc::new(ordered_indices(book.records(), spec));
        debug!(
            generation = %identity.generation,
            revision = identity.revision,
            matched = order.len(),
            "Recomputed lead view order"
        );

        self.cache = Some(CachedOrder {
            identity,
            spec: spec.clone(),
            order: order.clone(),
        });
        order
    }

    /// One page of the view. Page numbers start at 1; page 0 is read as 1.
    ///
    /// A zero page size is a spec error recovered with [`DEFAULT_PAGE_SIZE`].
    pub fn get_view(
        &mut self,
        book: &LeadBook,
        spec: &ViewSpec,
        page: usize,
        page_size: usize,
    ) -> PageView {
        let page_size = if page_size == 0 {
            warn!("Page size 0 requested, using {}", DEFAULT_PAGE_SIZE);
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        let page = page.max(1);

        let order = self.ordered(book, spec);
        let total_items = order.len();
        let start_index = (page - 1).saturating_mul(page_size);
        let end_index = start_index.saturating_add(page_size).min(total_items);

        let items = if start_index < total_items {
            order[start_index..end_index]
                .iter()
                .map(|&i| book.records()[i].clone())
                .collect()
        } else {
            Vec::new()
        };

        PageView {
            items,
            page,
            page_size,
            total_pages: page_count(total_items, page_size),
            total_items,
            start_index,
            end_index,
        }
    }

    /// (hits, misses) of the order cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
