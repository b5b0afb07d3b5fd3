//! CRM company import.
//!
//! Authenticates with OAuth client credentials, walks every analytics
//! dashboard, and collects `(company, location)` pairs from the rows of the
//! target reports. The result seeds `companies.csv` for a batch run.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::outputs::companies::CompanyRow;

pub const API_VERSION: &str = "v62.0";
/// Only rows from reports with these names are imported.
pub const TARGET_REPORTS: [&str; 2] = ["GOWT Ultra High's", "GOWT High's"];
pub const NAME_COLUMN: &str = "OPPORTUNITY_NAME";
pub const LOCATION_COLUMN: &str = "Opportunity.fid5__c";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the CRM's REST analytics API.
#[derive(Debug, Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    domain: String,
    token: String,
}

impl CrmClient {
    /// Exchange client credentials for an access token.
    #[instrument(level = "info", skip(http, client_id, client_secret))]
    pub async fn connect(
        http: reqwest::Client,
        domain: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self> {
        let domain = domain.trim_end_matches('/').to_string();
        let resp = http
            .post(format!("{domain}/services/oauth2/token"))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?
            .error_for_status()?;
        let token: TokenResponse = resp.json().await?;
        info!("Authenticated with CRM");

        Ok(Self {
            http,
            domain,
            token: token.access_token,
        })
    }

    async fn get(&self, endpoint: &str) -> Result<Value> {
        let url = format!("{}/services/data/{API_VERSION}/{endpoint}", self.domain);
        debug!(%url, "CRM GET");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn dashboard_ids(&self) -> Result<Vec<String>> {
        let listing = self.get("analytics/dashboards").await?;
        Ok(dashboard_ids(&listing))
    }

    /// Every target-report row across all dashboards.
    #[instrument(level = "info", skip(self))]
    pub async fn import_companies(&self) -> Result<Vec<CompanyRow>> {
        let ids = self.dashboard_ids().await?;
        info!(count = ids.len(), "Found dashboards");

        let mut companies = Vec::new();
        for id in ids {
            let detail = self.get(&format!("analytics/dashboards/{id}")).await?;
            let extracted = companies_from_dashboard(&detail);
            info!(dashboard = %id, count = extracted.len(), "Extracted companies");
            companies.extend(extracted);
        }

        info!(count = companies.len(), "Total companies extracted");
        Ok(companies)
    }
}

/// Ids from a dashboard listing, which may be wrapped in `{"dashboards": […]}`.
pub fn dashboard_ids(listing: &Value) -> Vec<String> {
    let entries = listing
        .get("dashboards")
        .unwrap_or(listing)
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();

    entries
        .iter()
        .filter_map(|d| d.get("id").or_else(|| d.get("Id")).and_then(Value::as_str))
        .map(String::from)
        .collect()
}

/// Company rows from one dashboard's component report results.
pub fn companies_from_dashboard(detail: &Value) -> Vec<CompanyRow> {
    let components = detail
        .get("componentData")
        .or_else(|| detail.get("components"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut rows = Vec::new();
    for report in components.iter().filter_map(|c| c.get("reportResult")) {
        let metadata = report.get("reportMetadata");
        let name = metadata
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !TARGET_REPORTS.contains(&name) {
            continue;
        }

        let columns: Vec<&str> = metadata
            .and_then(|m| m.get("detailColumns"))
            .and_then(Value::as_array)
            .map(|cols| cols.iter().map(|c| c.as_str().unwrap_or_default()).collect())
            .unwrap_or_default();
        let name_idx = columns.iter().position(|c| *c == NAME_COLUMN);
        let location_idx = columns.iter().position(|c| *c == LOCATION_COLUMN);

        let facts = report
            .get("factMap")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|m| m.values());
        for fact in facts {
            let fact_rows = fact
                .get("rows")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for row in fact_rows {
                let cells = row.get("dataCells").and_then(Value::as_array);
                let label = |idx: Option<usize>| {
                    idx.and_then(|i| cells?.get(i))
                        .and_then(|cell| cell.get("label"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string()
                };
                rows.push(CompanyRow {
                    company: label(name_idx),
                    location: label(location_idx),
                });
            }
        }
    }
    rows
}
