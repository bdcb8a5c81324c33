//! CatalogueSource trait
//!
//! The core abstraction shared by the catalogue adapters. The adapters have
//! nothing in common beyond this contract: each talks its own protocol and
//! gives COO its own meaning.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::{DocumentKind, Position, Retrieved, Source};

/// Trait for pluggable catalogue adapters
///
/// # Implementation Notes
///
/// - `search` resolves everything needed to fetch the documents; downloads
///   never repeat the lookup
/// - A document the catalogue does not offer is `Ok(Retrieved::Missing)`,
///   never an error
/// - Transport failures and unexpected HTTP statuses are
///   `SourceError::Network`, scoped to the single document being fetched
/// - Each download is independent: a failure for one kind must not affect
///   the others
#[async_trait]
pub trait CatalogueSource: Send + Sync {
    /// Which catalogue this adapter reads
    fn source(&self) -> Source;

    /// Human-readable name (e.g., "EDQM Chemical Reference Substances")
    fn source_name(&self) -> &'static str;

    /// Look up a catalogue code
    ///
    /// Returns `SourceError::NotFound` when the catalogue does not know the
    /// code.
    async fn search(&self, code: &str) -> Result<Position, SourceError>;

    /// Fetch the Certificate of Analysis
    async fn download_coa(&self, position: &Position) -> Result<Retrieved, SourceError>;

    /// Fetch the Safety Data Sheet
    async fn download_msds(&self, position: &Position) -> Result<Retrieved, SourceError>;

    /// Produce the Certificate of Origin output
    async fn download_coo(&self, position: &Position) -> Result<Retrieved, SourceError>;

    /// Dispatch on document kind
    async fn download(
        &self,
        position: &Position,
        kind: DocumentKind,
    ) -> Result<Retrieved, SourceError> {
        match kind {
            DocumentKind::Coa => self.download_coa(position).await,
            DocumentKind::Msds => self.download_msds(position).await,
            DocumentKind::Coo => self.download_coo(position).await,
        }
    }
}
