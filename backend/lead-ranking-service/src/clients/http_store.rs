use super::{LeadPage, PageQuery, RecordStore};
use crate::error::{LeadError, Result};
use crate::models::LeadRecord;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record store backed by the customer API.
pub struct HttpRecordStore {
    client: HttpClient,
    base_url: String,
    api_token: String,
}

impl HttpRecordStore {
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LeadError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        })
    }

    fn query_params(query: &PageQuery) -> Result<Vec<(&'static str, String)>> {
        let mut params = vec![
            ("page", query.page.to_string()),
            ("pageSize", query.page_size.to_string()),
        ];

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                params.push(("search", search.to_string()));
            }
        }

        if let Some(filters) = query.filters.as_ref().filter(|f| !f.is_pass_all()) {
            params.push(("filters", serde_json::to_string(filters)?));
        }

        Ok(params)
    }

    /// `{base}/private/customers/probability/{id}` with `id` as one encoded path segment.
    fn probability_url(&self, id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/private/customers/probability", self.base_url))
            .map_err(|e| LeadError::StoreWrite(format!("Invalid store URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                LeadError::StoreWrite(format!("Store URL cannot take a path: {}", self.base_url))
            })?
            .push(id);
        Ok(url)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> std::result::Result<Option<T>, String> {
        if self.status == "success" {
            Ok(self.data)
        } else {
            Err(self.message.unwrap_or(self.status))
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomersData {
    customers: Vec<LeadRecord>,
    total_pages: u32,
    total_items: u64,
}

#[derive(Serialize)]
struct ProbabilityBody {
    probability: f64,
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn fetch_page(&self, query: &PageQuery) -> Result<LeadPage> {
        let params = Self::query_params(query)?;

        let response = self
            .client
            .get(format!("{}/private/customers", self.base_url))
            .bearer_auth(&self.api_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| LeadError::StoreFetch(format!("Customer API error: {}", e)))?;

        let envelope: Envelope<CustomersData> = response
            .json()
            .await
            .map_err(|e| LeadError::StoreFetch(format!("Parse error: {}", e)))?;

        let data = envelope
            .into_data()
            .map_err(|msg| LeadError::StoreFetch(format!("Customer API rejected request: {}", msg)))?
            .ok_or_else(|| LeadError::StoreFetch("Customer API returned no data".to_string()))?;

        Ok(LeadPage {
            records: data.customers,
            total_pages: data.total_pages,
            total_items: data.total_items,
        })
    }

    async fn update_probability(&self, id: &str, probability: f64) -> Result<()> {
        let response = self
            .client
            .put(self.probability_url(id)?)
            .bearer_auth(&self.api_token)
            .json(&ProbabilityBody { probability })
            .send()
            .await
            .map_err(|e| LeadError::StoreWrite(format!("Customer API error: {}", e)))?;

        let envelope: Envelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| LeadError::StoreWrite(format!("Parse error: {}", e)))?;

        envelope
            .into_data()
            .map(|_| ())
            .map_err(|msg| LeadError::StoreWrite(format!("Probability update rejected: {}", msg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filter::{Choice, FilterSpec};

    #[test]
    fn test_query_params_skip_empty_options() {
        let mut query = PageQuery::page(2, 25);
        query.search = Some("   ".to_string());
        query.filters = Some(FilterSpec::default());

        let params = HttpRecordStore::query_params(&query).unwrap();
        assert_eq!(
            params,
            vec![("page", "2".to_string()), ("pageSize", "25".to_string())]
        );
    }

    #[test]
    fn test_query_params_encode_filters() {
        let mut query = PageQuery::page(1, 10);
        query.search = Some(" ayu ".to_string());
        query.filters = Some(FilterSpec {
            has_loan: Some(Choice::Yes),
            ..Default::default()
        });

        let params = HttpRecordStore::query_params(&query).unwrap();
        assert_eq!(params[2], ("search", "ayu".to_string()));
        assert_eq!(params[3].0, "filters");
        assert!(params[3].1.contains(r#""hasLoan":"Yes""#));
    }

    #[test]
    fn test_probability_url_encodes_id() {
        let store =
            HttpRecordStore::new("http://store.local/api/", "token", Duration::from_secs(5)).unwrap();

        assert_eq!(
            store.probability_url("C-17").unwrap().as_str(),
            "http://store.local/api/private/customers/probability/C-17"
        );
        assert_eq!(
            store.probability_url("C/1?x#y").unwrap().as_str(),
            "http://store.local/api/private/customers/probability/C%2F1%3Fx%23y"
        );
    }

    #[test]
    fn test_customers_envelope() {
        let envelope: Envelope<CustomersData> = serde_json::from_str(
            r#"{"status":"success","data":{"customers":[{"id":"C-1","name":"Ayu","probability":"40%"}],"totalPages":3,"totalItems":21,"page":1}}"#,
        )
        .unwrap();

        let data = envelope.into_data().unwrap().unwrap();
        assert_eq!(data.customers[0].probability, Some(40.0));
        assert_eq!(data.total_pages, 3);

        let failed: Envelope<CustomersData> =
            serde_json::from_str(r#"{"status":"fail","message":"token expired"}"#).unwrap();
        assert_eq!(failed.into_data().err().as_deref(), Some("token expired"));
    }
}
