//! EDQM product page parsing

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::sources::files::compact;
use crate::types::DocumentKind;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static NO_MATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(no (reference standards?|products?|results?|matches|items?) (found|match|matches|matching|for)|not found|does not exist|unknown (code|product))\b",
    )
    .unwrap()
});

/// Punctuation that separates words around a code, besides whitespace
const WORD_SEPARATORS: [char; 9] = [',', ';', '(', ')', '[', ']', '|', '/', '\''];

/// Link texts identifying each document on the product page
const LINK_TEXTS: [(DocumentKind, &str); 3] = [
    (DocumentKind::Coa, "certificate of analysis"),
    (DocumentKind::Msds, "safety data sheet"),
    (DocumentKind::Coo, "certificate of origin"),
];

/// An anchor found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductLink {
    pub text: String,
    pub url: Url,
}

/// Collect anchors, resolving hrefs against the page URL
fn anchors(html: &str, page_url: &Url) -> Vec<ProductLink> {
    ANCHOR_RE
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str().trim().replace("&amp;", "&");
            if href.starts_with('#') || href.to_lowercase().starts_with("javascript:") {
                return None;
            }
            let url = page_url.join(&href).ok()?;
            let inner = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let text = TAG_RE.replace_all(inner, " ");
            let text = WHITESPACE_RE.replace_all(text.trim(), " ").into_owned();
            Some(ProductLink { text, url })
        })
        .collect()
}

/// First link per document kind, matched on link text
pub fn find_document_links(html: &str, page_url: &Url) -> BTreeMap<DocumentKind, Url> {
    let mut found = BTreeMap::new();
    for link in anchors(html, page_url) {
        let text = link.text.to_lowercase();
        for (kind, needle) in LINK_TEXTS {
            if text.contains(needle) && !found.contains_key(&kind) {
                found.insert(kind, link.url.clone());
            }
        }
    }
    found
}

/// Whether the page text carries the code as a whole word
///
/// Words are compared alphanumerically and case-insensitively, so `Y-0001532`
/// matches `Y0001532` but `Y0001532` does not match `Y000153`.
pub fn mentions_code(html: &str, code: &str) -> bool {
    let needle = compact(code);
    if needle.is_empty() {
        return false;
    }
    let text = TAG_RE.replace_all(html, " ");
    text.split(|c: char| c.is_whitespace() || WORD_SEPARATORS.contains(&c))
        .any(|word| compact(word) == needle)
}

/// Whether the page is a search page reporting that nothing matched
pub fn reports_no_match(html: &str) -> bool {
    let text = TAG_RE.replace_all(html, " ");
    NO_MATCH_RE.is_match(&WHITESPACE_RE.replace_all(&text, " "))
}
