//! EDQM CatalogueSource implementation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use super::client::EdqmClient;
use super::page::{find_document_links, mentions_code, reports_no_match};
use crate::config::Config;
use crate::detect::{detect, CountryNaming, Detection};
use crate::error::SourceError;
use crate::sources::files::{country_path, document_filename, extension_for, save};
use crate::sources::traits::CatalogueSource;
use crate::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{DocumentKind, FileOrigin, Position, Retrieved, Source};

const SIGMA_TAG: &str = "sigma";

/// EDQM source loader
pub struct EdqmLoader {
    client: EdqmClient,
    dest_dir: PathBuf,
    naming: CountryNaming,
}

impl EdqmLoader {
    /// Create a loader with a reqwest transport built from config
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::from_config(config)?);
        Ok(Self::with_transport(transport, config))
    }

    /// Create with an existing transport
    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        Self {
            client: EdqmClient::new(transport, &config.endpoints),
            dest_dir: config.source_dir(Source::Edqm),
            naming: config.country_naming,
        }
    }

    /// GET a document link; `None` when the document does not exist upstream
    async fn fetch_document(
        &self,
        code: &str,
        url: &Url,
    ) -> Result<Option<HttpResponse>, SourceError> {
        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| SourceError::network(Source::Edqm, code, e))?;

        if response.is_absent() {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(SourceError::network(
                Source::Edqm,
                code,
                format!("HTTP {} from {}", response.status, url),
            ));
        }
        if response.body.is_empty() {
            return Ok(None);
        }
        Ok(Some(response))
    }

    /// Sigma-Aldrich SDS lookup; any failure degrades to `None`
    async fn sigma_fallback(&self, code: &str) -> Option<(Url, HttpResponse)> {
        let url = match self.client.sigma_sds_url(code) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(code, error = %e, "Cannot build Sigma-Aldrich SDS URL");
                return None;
            }
        };

        match self.client.get(&url).await {
            Ok(response) if response.is_success() && is_document(&response) => {
                Some((url, response))
            }
            Ok(response) => {
                tracing::info!(code, status = response.status, "No Sigma-Aldrich SDS");
                None
            }
            Err(e) => {
                tracing::warn!(code, error = %e, "Sigma-Aldrich SDS lookup failed");
                None
            }
        }
    }

    async fn store(
        &self,
        code: &str,
        name: String,
        kind: DocumentKind,
        origin: FileOrigin,
        content: &[u8],
    ) -> Result<Retrieved, SourceError> {
        let file = save(self.dest_dir.join(name), kind, origin, content)
            .await
            .map_err(|e| SourceError::io(Source::Edqm, code, e))?;
        tracing::info!(code, kind = %kind, file = %file.path.display(), "Saved");
        Ok(Retrieved::File(file))
    }
}

/// Sigma answers unknown products with an HTML page, so require a PDF
fn is_document(response: &HttpResponse) -> bool {
    !response.body.is_empty()
        && (response.body.starts_with(b"%PDF")
            || response.media_type().as_deref() == Some("application/pdf"))
}

#[async_trait]
impl CatalogueSource for EdqmLoader {
    fn source(&self) -> Source {
        Source::Edqm
    }

    fn source_name(&self) -> &'static str {
        "EDQM Chemical Reference Substances"
    }

    async fn search(&self, code: &str) -> Result<Position, SourceError> {
        let code = code.trim();
        let url = self
            .client
            .product_url(code)
            .map_err(|e| SourceError::network(Source::Edqm, code, e))?;

        let response = self
            .client
            .get(&url)
            .await
            .map_err(|e| SourceError::network(Source::Edqm, code, e))?;

        if response.is_absent() {
            return Err(SourceError::not_found(Source::Edqm, code));
        }
        if !response.is_success() {
            return Err(SourceError::network(
                Source::Edqm,
                code,
                format!("HTTP {} from {}", response.status, url),
            ));
        }

        let html = response.text();
        if reports_no_match(&html) || !mentions_code(&html, code) {
            return Err(SourceError::not_found(Source::Edqm, code));
        }

        let links = find_document_links(&html, &url);
        tracing::info!(
            code,
            documents = ?links.keys().collect::<Vec<_>>(),
            "Found EDQM product"
        );

        let mut position = Position::new(Source::Edqm, code)
            .with_metadata(serde_json::json!({ "product_url": url.as_str() }));
        position.links = links;
        Ok(position)
    }

    async fn download_coa(&self, position: &Position) -> Result<Retrieved, SourceError> {
        let code = position.code.as_str();
        let Some(url) = position.link(DocumentKind::Coa) else {
            return Ok(Retrieved::missing("no Certificate of Analysis link"));
        };
        let Some(response) = self.fetch_document(code, url).await? else {
            return Ok(Retrieved::missing("Certificate of Analysis not available"));
        };

        let ext = extension_for(url, response.media_type().as_deref());
        let name = document_filename(code, DocumentKind::Coa, None, &ext);
        self.store(code, name, DocumentKind::Coa, FileOrigin::Edqm, &response.body)
            .await
    }

    async fn download_msds(&self, position: &Position) -> Result<Retrieved, SourceError> {
        let code = position.code.as_str();

        if let Some(url) = position.link(DocumentKind::Msds) {
            if let Some(response) = self.fetch_document(code, url).await? {
                let ext = extension_for(url, response.media_type().as_deref());
                let name = document_filename(code, DocumentKind::Msds, None, &ext);
                return self
                    .store(code, name, DocumentKind::Msds, FileOrigin::Edqm, &response.body)
                    .await;
            }
        }

        tracing::info!(code, "No EDQM safety data sheet, trying Sigma-Aldrich");
        let Some((url, response)) = self.sigma_fallback(code).await else {
            return Ok(Retrieved::missing(
                "no safety data sheet on EDQM or Sigma-Aldrich",
            ));
        };

        let ext = extension_for(&url, response.media_type().as_deref());
        let name = document_filename(code, DocumentKind::Msds, Some(SIGMA_TAG), &ext);
        self.store(code, name, DocumentKind::Msds, FileOrigin::Sigma, &response.body)
            .await
    }

    async fn download_coo(&self, position: &Position) -> Result<Retrieved, SourceError> {
        let code = position.code.as_str();
        let Some(url) = position.link(DocumentKind::Coo) else {
            return Ok(Retrieved::missing("no Certificate of Origin link"));
        };
        let Some(response) = self.fetch_document(code, url).await? else {
            return Ok(Retrieved::missing("Certificate of Origin not available"));
        };

        let ext = extension_for(url, response.media_type().as_deref());
        let stem = match detect(&response.body) {
            Detection::Country(country) => {
                tracing::info!(code, country = %country, "Detected country of origin");
                Some(self.naming.stem(&country, "")).filter(|s| !s.is_empty())
            }
            Detection::Unknown => None,
        };
        let path = match stem {
            Some(stem) => country_path(&self.dest_dir, &stem, code, &ext, &response.body).await,
            None => {
                tracing::warn!(code, "Country of origin not detected, keeping fallback name");
                self.dest_dir
                    .join(document_filename(code, DocumentKind::Coo, None, &ext))
            }
        };

        let file = save(path, DocumentKind::Coo, FileOrigin::Edqm, &response.body)
            .await
            .map_err(|e| SourceError::io(Source::Edqm, code, e))?;
        tracing::info!(code, file = %file.path.display(), "Saved COO");
        Ok(Retrieved::File(file))
    }
}
