//! EDQM Source
//!
//! Retrieves documents for EDQM Chemical Reference Substances from the CRS
//! catalogue at `crs.edqm.eu`.
//!
//! # Coverage
//!
//! - **Key type:** CRS catalogue code (e.g. `Y0001532`)
//! - **COA / MSDS:** links on the product page
//! - **MSDS fallback:** Sigma-Aldrich SDS catalogue, saved as `<code>_MSDS_sigma.<ext>`
//! - **COO:** the downloaded certificate, renamed to `<Country>.<ext>`

mod client;
mod loader;
mod page;

pub use client::EdqmClient;
pub use loader::EdqmLoader;
pub use page::{find_document_links, mentions_code, reports_no_match, ProductLink};
