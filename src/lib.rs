//! edqm-usp - Reference standard document retrieval
//!
//! Fetches Certificates of Analysis, Safety Data Sheets and Certificates of
//! Origin for EDQM and USP catalogue codes, names the files consistently,
//! optionally bundles them into archives and mirrors the download tree to
//! Yandex Disk.
//!
//! ## Flow
//! Catalogue code -> `CatalogueSource::search` -> Position -> per-document
//! download -> CodeReport -> Bundle -> Upload
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edqm_usp::config::Config;
//! use edqm_usp::pipeline::retrieve;
//! use edqm_usp::sources;
//! use edqm_usp::types::{DocumentKind, Source};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let edqm = sources::from_config(Source::Edqm, &config)?;
//! let report = retrieve(edqm.as_ref(), "Y0001532", &DocumentKind::ALL).await;
//! println!("{:?}", report.status);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Domain types and configuration
pub mod config;
pub mod types;

// Country of origin detection and filename policy
pub mod detect;

// HTTP access and catalogue adapters
pub mod sources;
pub mod transport;

// Retrieval, packaging and publishing
pub mod bundle;
pub mod pipeline;
pub mod upload;

pub use config::Config;
pub use error::{BundleError, SourceError, UploadError};
pub use sources::CatalogueSource;
pub use types::{DocumentKind, Position, Source, UploadScope};
