//! USP product search API types

use serde::{Deserialize, Serialize};

/// Body of `/api/products/search`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UspSearchResponse {
    #[serde(default)]
    pub products: Vec<UspProduct>,
}

/// A reference standard as returned by the search API
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UspProduct {
    pub catalog_number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "lotNumber")]
    pub current_lot: Option<String>,
    #[serde(default)]
    pub country_of_origin: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Explicit certificate link, when the catalogue provides one
    #[serde(default)]
    pub coa_url: Option<String>,
    /// Explicit SDS link, when the catalogue provides one
    #[serde(default, alias = "msdsUrl")]
    pub sds_url: Option<String>,
}

impl UspProduct {
    /// Text the country detector runs over for the COO output
    pub fn origin_text(&self) -> String {
        let mut text = String::new();
        if let Some(country) = self.country_of_origin.as_deref().filter(|c| !c.trim().is_empty()) {
            text.push_str("Country of origin: ");
            text.push_str(country.trim());
            text.push('\n');
        }
        if let Some(description) = &self.description {
            text.push_str(description);
            text.push('\n');
        }
        text
    }
}
