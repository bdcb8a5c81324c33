//! Catalogue source adapters
//!
//! Each catalogue implements [`CatalogueSource`]; the pipeline only ever
//! sees the trait.

pub mod edqm;
pub mod files;
pub mod traits;
pub mod usp;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::Source;

pub use traits::CatalogueSource;

/// Adapter for a source over an existing transport
pub fn source_for(
    source: Source,
    transport: Arc<dyn HttpTransport>,
    config: &Config,
) -> Box<dyn CatalogueSource> {
    match source {
        Source::Edqm => Box::new(edqm::EdqmLoader::with_transport(transport, config)),
        Source::Usp => Box::new(usp::UspLoader::with_transport(transport, config)),
    }
}

/// Adapter for a source over a fresh reqwest transport
pub fn from_config(source: Source, config: &Config) -> Result<Box<dyn CatalogueSource>> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::from_config(config)?);
    Ok(source_for(source, transport, config))
}
