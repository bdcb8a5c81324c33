//! Country of origin detection
//!
//! Infers the country an item was manufactured in from the content of a
//! certificate (PDF, HTML or plain text). Detection is a pure function: no
//! match yields [`Detection::Unknown`] and the caller picks a fallback name.
//!
//! Also owns the naming policy that turns a detected country into a file
//! stem, since the two catalogues' sample outputs disagree on spacing.

use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

// =============================================================================
// PATTERNS
// =============================================================================

/// Labelled country patterns, tried in order
static LABEL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)country\s*of\s*origin\s*[:\-]\s*([A-Za-z][A-Za-z\s\-',().]{1,80})",
        r"(?i)origin\s*country\s*[:\-]\s*([A-Za-z][A-Za-z\s\-',().]{1,80})",
        r"(?i)manufactured\s*in\s*[:\-]?\s*([A-Za-z][A-Za-z\s\-',().]{1,80})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap());

static LEADING_FILLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(is|the)\s+").unwrap());

static UNSAFE_FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());

const MAX_COUNTRY_WORDS: usize = 6;

// =============================================================================
// DETECTION
// =============================================================================

/// Result of running the detector over a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    Country(String),
    Unknown,
}

impl Detection {
    pub fn country(&self) -> Option<&str> {
        match self {
            Detection::Country(name) => Some(name),
            Detection::Unknown => None,
        }
    }
}

/// Detect the origin country from raw document bytes
pub fn detect(content: &[u8]) -> Detection {
    detect_in_text(&document_text(content))
}

/// Detect the origin country from already extracted text
pub fn detect_in_text(text: &str) -> Detection {
    if text.trim().is_empty() {
        return Detection::Unknown;
    }

    for pattern in LABEL_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(text) {
            if let Some(candidate) = caps.get(1).and_then(|m| clean_candidate(m.as_str())) {
                return Detection::Country(candidate);
            }
        }
    }

    // Value on the same line after a colon, or on the following line
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    for (idx, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if !(lower.contains("country of origin") || lower.contains("origin country")) {
            continue;
        }
        if let Some((_, after)) = line.split_once(':') {
            if let Some(candidate) = clean_candidate(after) {
                return Detection::Country(candidate);
            }
        }
        if let Some(candidate) = lines.get(idx + 1).and_then(|next| clean_candidate(next)) {
            return Detection::Country(candidate);
        }
    }

    Detection::Unknown
}

/// Extract searchable text from document bytes
///
/// PDFs go through `pdf-extract`; anything else is decoded as UTF-8 (lossy).
/// Markup tags are replaced with spaces and character references decoded.
pub fn document_text(content: &[u8]) -> String {
    let raw = if content.starts_with(b"%PDF") {
        match pdf_text(content) {
            Some(text) => text,
            None => String::from_utf8_lossy(content).into_owned(),
        }
    } else {
        String::from_utf8_lossy(content).into_owned()
    };
    let text = TAG_RE.replace_all(&raw, " ");
    decode_entities(&text)
}

/// Decode `&nbsp;`, the XML entities and numeric character references;
/// unknown named entities are left as they are
fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "nbsp" => Some(' '),
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32)
                    .map(|c| if c == '\u{a0}' { ' ' } else { c }),
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn pdf_text(content: &[u8]) -> Option<String> {
    // pdf-extract panics on some malformed inputs
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(content)) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Failed to extract text from PDF");
            None
        }
        Err(_) => {
            tracing::warn!("PDF text extraction panicked");
            None
        }
    }
}

fn clean_candidate(value: &str) -> Option<String> {
    let value = value.trim();
    let value = value.split([';', '\n', '\r']).next().unwrap_or("");
    let value = WHITESPACE_RE.replace_all(value, " ");
    let value = value.trim_matches(|c: char| matches!(c, ' ' | '.' | ',' | ':' | '-'));
    let value = LEADING_FILLER_RE.replace(value, "");
    let value = value.trim();

    if value.is_empty()
        || value.chars().any(|c| c.is_ascii_digit())
        || value.split_whitespace().count() > MAX_COUNTRY_WORDS
    {
        return None;
    }
    Some(title_case(value))
}

/// Title-case each word, keeping short all-caps acronyms (USA, UK)
fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(|word| {
            let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
            if !letters.is_empty() && letters.len() <= 3 && letters.iter().all(|c| c.is_uppercase()) {
                return word.to_string();
            }
            let mut out = String::with_capacity(word.len());
            let mut prev_alpha = false;
            for c in word.chars() {
                if c.is_alphabetic() {
                    if prev_alpha {
                        out.extend(c.to_lowercase());
                    } else {
                        out.extend(c.to_uppercase());
                    }
                    prev_alpha = true;
                } else {
                    out.push(c);
                    prev_alpha = false;
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// NAMING POLICY
// =============================================================================

/// How a detected country becomes a filename stem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountryNaming {
    /// `United States`
    #[default]
    Spaced,
    /// `United_States`
    Underscored,
}

impl CountryNaming {
    /// Filesystem-safe stem for a country name; `fallback` when nothing survives
    pub fn stem(&self, country: &str, fallback: &str) -> String {
        let stem = safe_filename(country);
        let stem = if stem.is_empty() {
            safe_filename(fallback)
        } else {
            stem
        };
        match self {
            CountryNaming::Spaced => stem,
            CountryNaming::Underscored => stem.split_whitespace().collect::<Vec<_>>().join("_"),
        }
    }
}

impl FromStr for CountryNaming {
    type Err = crate::types::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spaced" | "space" | "spaces" => Ok(CountryNaming::Spaced),
            "underscore" | "underscored" | "underscores" => Ok(CountryNaming::Underscored),
            other => Err(crate::types::ParseEnumError::new(format!(
                "Unknown country naming '{}'. Valid values: spaced, underscore",
                other
            ))),
        }
    }
}

/// Fold to ASCII and strip characters that are invalid in filenames
pub fn safe_filename(value: &str) -> String {
    let folded: String = value.nfkd().filter(|c| c.is_ascii()).collect();
    let replaced = UNSAFE_FILENAME_RE.replace_all(&folded, "_");
    replaced
        .trim()
        .trim_matches('.')
        .trim()
        .to_string()
}
