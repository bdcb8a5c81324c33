//! USP CatalogueSource implementation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use super::client::{SearchReply, UspClient};
use super::types::UspProduct;
use crate::config::Config;
use crate::detect::{detect_in_text, CountryNaming, Detection};
use crate::error::SourceError;
use crate::sources::files::{compact, country_path, document_filename, extension_for, save};
use crate::sources::traits::CatalogueSource;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{DocumentKind, FileOrigin, Position, Retrieved, Source};

pub const UNKNOWN_COUNTRY: &str = "Unknown Country";

/// USP source loader
pub struct UspLoader {
    client: UspClient,
    dest_dir: PathBuf,
    naming: CountryNaming,
}

impl UspLoader {
    /// Create a loader with a reqwest transport built from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::from_config(config)?);
        Ok(Self::with_transport(transport, config))
    }

    /// Create with an existing transport
    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        Self {
            client: UspClient::new(transport, &config.endpoints),
            dest_dir: config.source_dir(Source::Usp),
            naming: config.country_naming,
        }
    }

    /// Download one static document; 404/410 and empty bodies are `Missing`
    async fn fetch_to_file(
        &self,
        code: &str,
        kind: DocumentKind,
        url: &Url,
    ) -> Result<Retrieved, SourceError> {
        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| SourceError::network(Source::Usp, code, e))?;

        if response.is_absent() {
            return Ok(Retrieved::missing(format!("{} not published by USP", kind)));
        }
        if !response.is_success() {
            return Err(SourceError::network(
                Source::Usp,
                code,
                format!("HTTP {} from {}", response.status, url),
            ));
        }
        if response.body.is_empty() {
            return Ok(Retrieved::missing(format!("{} is empty", kind)));
        }

        let ext = extension_for(url, response.media_type().as_deref());
        let path = self
            .dest_dir
            .join(document_filename(code, kind, None, &ext));
        let file = save(path, kind, FileOrigin::Usp, &response.body)
            .await
            .map_err(|e| SourceError::io(Source::Usp, code, e))?;
        tracing::info!(code, kind = %kind, file = %file.path.display(), "Saved");
        Ok(Retrieved::File(file))
    }
}

/// Product carried in the position metadata by `search`
fn product_of(position: &Position) -> UspProduct {
    serde_json::from_value(position.metadata["product"].clone()).unwrap_or_else(|_| UspProduct {
        catalog_number: position.code.clone(),
        ..Default::default()
    })
}

#[async_trait]
impl CatalogueSource for UspLoader {
    fn source(&self) -> Source {
        Source::Usp
    }

    fn source_name(&self) -> &'static str {
        "USP Reference Standards"
    }

    async fn search(&self, code: &str) -> Result<Position, SourceError> {
        let code = code.trim();
        let reply = self
            .client
            .search(code)
            .await
            .map_err(|e| SourceError::network(Source::Usp, code, e))?;

        let products = match reply {
            SearchReply::Products(found) => found.products,
            SearchReply::Absent => return Err(SourceError::not_found(Source::Usp, code)),
            SearchReply::Status(status) => {
                return Err(SourceError::network(
                    Source::Usp,
                    code,
                    format!("HTTP {} from product search", status),
                ))
            }
            SearchReply::Malformed(message) => {
                return Err(SourceError::network(
                    Source::Usp,
                    code,
                    format!("unexpected search response: {}", message),
                ))
            }
        };

        let wanted = compact(code);
        let Some(product) = products
            .into_iter()
            .find(|p| !wanted.is_empty() && compact(&p.catalog_number) == wanted)
        else {
            return Err(SourceError::not_found(Source::Usp, code));
        };

        tracing::info!(
            code,
            name = product.name.as_deref().unwrap_or(""),
            lot = product.current_lot.as_deref().unwrap_or(""),
            "Found USP product"
        );

        let mut position = Position::new(Source::Usp, code);
        if let Some(url) = self.client.coa_url(&product) {
            position = position.with_link(DocumentKind::Coa, url);
        }
        if let Some(url) = self.client.msds_url(&product) {
            position = position.with_link(DocumentKind::Msds, url);
        }
        Ok(position.with_metadata(serde_json::json!({ "product": product })))
    }

    async fn download_coa(&self, position: &Position) -> Result<Retrieved, SourceError> {
        match position.link(DocumentKind::Coa) {
            Some(url) => {
                self.fetch_to_file(&position.code, DocumentKind::Coa, url)
                    .await
            }
            None => Ok(Retrieved::missing("no current lot, certificate unavailable")),
        }
    }

    async fn download_msds(&self, position: &Position) -> Result<Retrieved, SourceError> {
        match position.link(DocumentKind::Msds) {
            Some(url) => {
                self.fetch_to_file(&position.code, DocumentKind::Msds, url)
                    .await
            }
            None => Ok(Retrieved::missing("no safety data sheet URL")),
        }
    }

    async fn download_coo(&self, position: &Position) -> Result<Retrieved, SourceError> {
        let code = position.code.as_str();
        let product = product_of(position);

        let country = match detect_in_text(&product.origin_text()) {
            Detection::Country(country) => country,
            Detection::Unknown => {
                tracing::warn!(code, "Country of origin not detected");
                UNKNOWN_COUNTRY.to_string()
            }
        };
        let stem = self.naming.stem(&country, UNKNOWN_COUNTRY);
        let content = format!("{}\n", country);

        let path = country_path(&self.dest_dir, &stem, code, "txt", content.as_bytes()).await;
        let file = save(path, DocumentKind::Coo, FileOrigin::Synthesized, content.as_bytes())
            .await
            .map_err(|e| SourceError::io(Source::Usp, code, e))?;
        tracing::info!(code, country = %country, file = %file.path.display(), "Saved COO");
        Ok(Retrieved::File(file))
    }
}
