//! USP adapter against canned API responses

mod helpers;

use edqm_usp::detect::CountryNaming;
use edqm_usp::pipeline::{retrieve, CodeStatus};
use edqm_usp::sources::usp::UspLoader;
use edqm_usp::sources::CatalogueSource;
use edqm_usp::types::{DocumentKind, FileOrigin, Retrieved};
use helpers::{shared, test_config, FakeTransport};
use serde_json::json;

const SEARCH: &str = "https://store.usp.org/api/products/search?q=1134357";
const COA: &str = "https://static.usp.org/pdf/EN/referenceStandards/certificates/1134357-R11820.pdf";
const MSDS: &str = "https://static.usp.org/pdf/EN/referenceStandards/msds/1134357.pdf";

fn famotidine(origin: Option<&str>) -> FakeTransport {
    FakeTransport::new()
        .json(
            SEARCH,
            json!({
                "products": [
                    { "catalogNumber": "11343570", "name": "Famotidine Related Compound" },
                    {
                        "catalogNumber": "1134357",
                        "name": "Famotidine",
                        "currentLot": "R11820",
                        "countryOfOrigin": origin,
                    }
                ]
            }),
        )
        .pdf(COA, b"%PDF-1.4 famotidine certificate")
        .pdf(MSDS, b"%PDF-1.4 famotidine sds")
}

#[tokio::test]
async fn test_full_retrieval() {
    let dir = tempfile::tempdir().unwrap();
    let loader = UspLoader::with_transport(shared(famotidine(Some("India"))), &test_config(dir.path()));

    let report = retrieve(&loader, "1134357", &[]).await;

    assert_eq!(report.status, CodeStatus::Complete);
    let usp = dir.path().join("usp");
    assert!(usp.join("1134357_COA.pdf").is_file());
    assert!(usp.join("1134357_MSDS.pdf").is_file());
    assert_eq!(std::fs::read_to_string(usp.join("India.txt")).unwrap(), "India\n");
}

#[tokio::test]
async fn test_exact_catalogue_number_selected() {
    let dir = tempfile::tempdir().unwrap();
    let loader = UspLoader::with_transport(shared(famotidine(None)), &test_config(dir.path()));

    let position = loader.search("1134357").await.unwrap();

    assert_eq!(position.metadata["product"]["name"], "Famotidine");
    assert_eq!(position.link(DocumentKind::Coa).unwrap().as_str(), COA);
    assert_eq!(position.link(DocumentKind::Msds).unwrap().as_str(), MSDS);
}

#[tokio::test]
async fn test_no_exact_match_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new().json(
        "https://store.usp.org/api/products/search?q=113435",
        json!({ "products": [{ "catalogNumber": "1134357" }] }),
    );
    let loader = UspLoader::with_transport(shared(transport), &test_config(dir.path()));

    assert!(loader.search("113435").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_search_server_error_is_network() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new().route(SEARCH, 503, "text/plain", "maintenance");
    let loader = UspLoader::with_transport(shared(transport), &test_config(dir.path()));

    let report = retrieve(&loader, "1134357", &[]).await;

    assert!(!report.resolved);
    assert_eq!(report.status, CodeStatus::Failed);
    assert!(report.error.unwrap().contains("HTTP 503"));
}

// =============================================================================
// COO
// =============================================================================

#[tokio::test]
async fn test_coo_is_always_text() {
    let dir = tempfile::tempdir().unwrap();
    let loader = UspLoader::with_transport(
        shared(famotidine(Some("united states of america"))),
        &test_config(dir.path()),
    );
    let position = loader.search("1134357").await.unwrap();

    let retrieved = loader.download_coo(&position).await.unwrap();

    let file = retrieved.file().unwrap();
    assert_eq!(file.name, "United States Of America.txt");
    assert_eq!(file.origin, FileOrigin::Synthesized);
    assert_eq!(file.kind, DocumentKind::Coo);
}

#[tokio::test]
async fn test_unknown_country_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let loader = UspLoader::with_transport(shared(famotidine(None)), &test_config(dir.path()));
    let position = loader.search("1134357").await.unwrap();

    let retrieved = loader.download_coo(&position).await.unwrap();

    assert_eq!(retrieved.file().unwrap().name, "Unknown Country.txt");
}

#[tokio::test]
async fn test_underscored_naming_policy() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.country_naming = CountryNaming::Underscored;
    let loader = UspLoader::with_transport(shared(famotidine(Some("South Korea"))), &config);
    let position = loader.search("1134357").await.unwrap();

    let retrieved = loader.download_coo(&position).await.unwrap();

    assert_eq!(retrieved.file().unwrap().name, "South_Korea.txt");
}

// =============================================================================
// DOCUMENTS
// =============================================================================

#[tokio::test]
async fn test_no_lot_means_missing_coa() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new()
        .json(SEARCH, json!({ "products": [{ "catalogNumber": "1134357" }] }))
        .pdf(MSDS, b"%PDF-1.4 sds");
    let loader = UspLoader::with_transport(shared(transport), &test_config(dir.path()));

    let report = retrieve(&loader, "1134357", &[DocumentKind::Coa, DocumentKind::Msds]).await;

    assert_eq!(report.status, CodeStatus::Partial);
    assert_eq!(report.files()[0].name, "1134357_MSDS.pdf");
}

#[tokio::test]
async fn test_unpublished_msds_missing() {
    let dir = tempfile::tempdir().unwrap();
    let transport = famotidine(Some("India")).route(MSDS, 404, "text/html", "gone");
    let loader = UspLoader::with_transport(shared(transport), &test_config(dir.path()));
    let position = loader.search("1134357").await.unwrap();

    let retrieved = loader.download_msds(&position).await.unwrap();

    assert!(matches!(retrieved, Retrieved::Missing(_)));
    assert!(!dir.path().join("usp/1134357_MSDS.pdf").exists());
}
