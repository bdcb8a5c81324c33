//! EDQM CRS catalogue client
//!
//! Builds catalogue and Sigma-Aldrich URLs and performs the GETs through the
//! injected transport.

use std::sync::Arc;

use url::Url;

use crate::config::Endpoints;
use crate::error::FetchError;
use crate::transport::{HttpResponse, HttpTransport};

/// EDQM CRS catalogue client
pub struct EdqmClient {
    transport: Arc<dyn HttpTransport>,
    base: String,
    sigma_base: String,
    sigma_brand: String,
}

impl EdqmClient {
    pub fn new(transport: Arc<dyn HttpTransport>, endpoints: &Endpoints) -> Self {
        Self {
            transport,
            base: endpoints.edqm_base.trim_end_matches('/').to_string(),
            sigma_base: endpoints.sigma_base.trim_end_matches('/').to_string(),
            sigma_brand: endpoints.sigma_brand.trim_matches('/').to_lowercase(),
        }
    }

    /// Product page for an exact catalogue code
    pub fn product_url(&self, code: &str) -> Result<Url, FetchError> {
        parse_url(format!("{}/db/4DCGI/View={}", self.base, encode_segment(code)))
    }

    /// Sigma-Aldrich SDS for the same code
    pub fn sigma_sds_url(&self, code: &str) -> Result<Url, FetchError> {
        parse_url(format!(
            "{}/US/en/sds/{}/{}",
            self.sigma_base,
            self.sigma_brand,
            encode_segment(&code.to_lowercase())
        ))
    }

    pub async fn get(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        self.transport.get(url.as_str()).await
    }
}

fn parse_url(raw: String) -> Result<Url, FetchError> {
    Url::parse(&raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.clone(),
        message: e.to_string(),
    })
}

fn encode_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.trim().as_bytes()).collect()
}
