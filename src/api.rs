use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::error::Result;
use crate::token::TokenRecord;

/// Authenticated, blocking client for the accounting API's read endpoints.
///
/// Holds the bearer credential and realm for one Extractor run. Non-success
/// responses are a soft "no data available" outcome, not an error; only
/// transport-level failures surface as `Err`.
pub struct ApiClient {
    http: Client,
    base_url: Url,
    access_token: String,
    realm_id: String,
}

impl ApiClient {
    /// Creates a client for the realm the token is scoped to.
    pub fn new(base_url: Url, token: &TokenRecord) -> Self {
        Self {
            http: Client::new(),
            base_url,
            access_token: token.access_token.clone(),
            realm_id: token.realm_id.clone(),
        }
    }

    /// Fetches an accounting report such as `TrialBalance` or `GeneralLedger`.
    pub fn fetch_report(&self, report_name: &str, params: &[(&str, &str)]) -> Result<Option<Value>> {
        let url = self.resource_url(&format!("reports/{report_name}"))?;
        self.fetch(report_name, url, params)
    }

    /// Fetches transactional entities such as `invoice` or `journalentry`.
    pub fn fetch_entities(&self, entity_type: &str, params: &[(&str, &str)]) -> Result<Option<Value>> {
        let url = self.resource_url(entity_type)?;
        self.fetch(entity_type, url, params)
    }

    fn resource_url(&self, suffix: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!(
            "{base}/v3/company/{}/{suffix}",
            self.realm_id
        ))?)
    }

    fn fetch(&self, label: &str, url: Url, params: &[(&str, &str)]) -> Result<Option<Value>> {
        let response = self
            .http
            .get(url)
            .query(params)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/json")
            .send()?;
        let status = response.status();
        let body = response.text()?;
        handle_payload(label, status, &body)
    }
}

/// Maps a response to its parsed body, or to `None` for non-200 statuses.
fn handle_payload(label: &str, status: StatusCode, body: &str) -> Result<Option<Value>> {
    if status == StatusCode::OK {
        info!(label, "pulled");
        Ok(Some(serde_json::from_str(body)?))
    } else {
        warn!(label, %status, body, "request failed; treating as no data");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let token = TokenRecord {
            access_token: "token".to_string(),
            refresh_token: String::new(),
            realm_id: "1234".to_string(),
            expires_in: None,
            x_refresh_token_expires_in: None,
        };
        ApiClient::new("https://example.com".parse().expect("url"), &token)
    }

    #[test]
    fn report_url_targets_the_realm() {
        let url = client()
            .resource_url("reports/TrialBalance")
            .expect("url built");
        assert_eq!(
            url.as_str(),
            "https://example.com/v3/company/1234/reports/TrialBalance"
        );
    }

    #[test]
    fn entity_url_targets_the_realm() {
        let url = client().resource_url("invoice").expect("url built");
        assert_eq!(url.as_str(), "https://example.com/v3/company/1234/invoice");
    }

    #[test]
    fn ok_payload_is_parsed_unmodified() {
        let document = handle_payload("invoice", StatusCode::OK, r#"{"QueryResponse":{}}"#)
            .expect("handled")
            .expect("document");
        assert_eq!(document, serde_json::json!({"QueryResponse": {}}));
    }

    #[test]
    fn non_ok_status_yields_no_data_without_error() {
        let outcome =
            handle_payload("TrialBalance", StatusCode::FORBIDDEN, r#"{"Fault":{}}"#)
                .expect("handled");
        assert!(outcome.is_none());
    }

    #[test]
    fn unparseable_ok_body_is_an_error() {
        assert!(handle_payload("invoice", StatusCode::OK, "not json").is_err());
    }
}
