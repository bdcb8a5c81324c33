//! USP Source
//!
//! Retrieves documents for USP Reference Standards.
//!
//! # Coverage
//!
//! - **Key type:** USP catalogue number (e.g. `1134357`)
//! - **Search:** store product search API, exact catalogue number match
//! - **COA:** static certificate for the current lot
//! - **MSDS:** static safety data sheet
//! - **COO:** synthesized `<Country>.txt` from the product metadata

mod client;
mod loader;
mod types;

pub use client::{SearchReply, UspClient};
pub use loader::{UspLoader, UNKNOWN_COUNTRY};
pub use types::{UspProduct, UspSearchResponse};
