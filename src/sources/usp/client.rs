//! USP Reference Standards API client
//!
//! Product search goes to the store API; certificates and safety data
//! sheets are static files whose URLs derive from the catalogue number.

use std::sync::Arc;

use url::Url;

use super::types::{UspProduct, UspSearchResponse};
use crate::config::Endpoints;
use crate::error::FetchError;
use crate::transport::{HttpResponse, HttpTransport};

/// Outcome of a product search request
#[derive(Debug)]
pub enum SearchReply {
    Products(UspSearchResponse),
    /// The API answered 404/410
    Absent,
    /// Any other non-success status
    Status(u16),
    /// Body was not a valid search response
    Malformed(String),
}

/// USP API client
pub struct UspClient {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    static_base: String,
}

impl UspClient {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoints: &Endpoints) -> Self {
        Self {
            transport,
            api_base: endpoints.usp_api_base.trim_end_matches('/').to_string(),
            static_base: endpoints.usp_static_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn search_url(&self, code: &str) -> Result<Url, FetchError> {
        let raw = format!("{}/api/products/search", self.api_base);
        let mut url = parse_url(&raw)?;
        url.query_pairs_mut().append_pair("q", code.trim());
        Ok(url)
    }

    /// Search the catalogue for a code
    pub async fn search(&self, code: &str) -> Result<SearchReply, FetchError> {
        let url = self.search_url(code)?;
        let response = self.transport.get(url.as_str()).await?;

        if response.is_absent() {
            return Ok(SearchReply::Absent);
        }
        if !response.is_success() {
            return Ok(SearchReply::Status(response.status));
        }
        match serde_json::from_slice::<UspSearchResponse>(&response.body) {
            Ok(parsed) => Ok(SearchReply::Products(parsed)),
            Err(e) => Ok(SearchReply::Malformed(e.to_string())),
        }
    }

    /// Certificate URL: explicit link, else the static path for the current lot
    pub fn coa_url(&self, product: &UspProduct) -> Option<Url> {
        if let Some(url) = product.coa_url.as_deref().and_then(|u| Url::parse(u).ok()) {
            return Some(url);
        }
        let lot = product.current_lot.as_deref()?.trim();
        if lot.is_empty() {
            return None;
        }
        parse_url(&format!(
            "{}/pdf/EN/referenceStandards/certificates/{}-{}.pdf",
            self.static_base,
            encode_segment(&product.catalog_number),
            encode_segment(lot)
        ))
        .ok()
    }

    /// Safety data sheet URL: explicit link, else the static path
    pub fn msds_url(&self, product: &UspProduct) -> Option<Url> {
        if let Some(url) = product.sds_url.as_deref().and_then(|u| Url::parse(u).ok()) {
            return Some(url);
        }
        parse_url(&format!(
            "{}/pdf/EN/referenceStandards/msds/{}.pdf",
            self.static_base,
            encode_segment(&product.catalog_number)
        ))
        .ok()
    }

    pub async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        self.transport.get(url.as_str()).await
    }
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

fn encode_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.trim().as_bytes()).collect()
}
