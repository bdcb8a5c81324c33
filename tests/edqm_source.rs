//! EDQM adapter against canned catalogue responses

mod helpers;

use edqm_usp::pipeline::{retrieve, CodeStatus, DocumentStatus};
use edqm_usp::sources::edqm::EdqmLoader;
use edqm_usp::sources::CatalogueSource;
use edqm_usp::types::{DocumentKind, FileOrigin, Retrieved};
use helpers::{shared, test_config, FakeTransport};

const OMEPRAZOLE_PAGE: &str = "https://crs.edqm.eu/db/4DCGI/View=Y0001532";
const OMEPRAZOLE_COA: &str = "https://crs.edqm.eu/docs/Y0001532_coa.pdf";
const OMEPRAZOLE_COO: &str = "https://crs.edqm.eu/docs/Y0001532_coo.pdf";
const OMEPRAZOLE_SIGMA: &str = "https://www.sigmaaldrich.com/US/en/sds/sial/y0001532";

const GLYCEROL_PAGE: &str = "https://crs.edqm.eu/db/4DCGI/View=G0400006";
const GLYCEROL_COA: &str = "https://crs.edqm.eu/docs/G0400006_coa.pdf";
const GLYCEROL_SDS: &str = "https://crs.edqm.eu/docs/G0400006_sds.pdf";
const GLYCEROL_SIGMA: &str = "https://www.sigmaaldrich.com/US/en/sds/sial/g0400006";

fn omeprazole() -> FakeTransport {
    FakeTransport::new()
        .html(
            OMEPRAZOLE_PAGE,
            r#"<html><body>
                <h1>Omeprazole CRS</h1>
                <p>Catalogue code: Y0001532</p>
                <a href="/docs/Y0001532_coa.pdf">Certificate of Analysis</a>
                <a href="/docs/Y0001532_coo.pdf">Certificate of Origin</a>
            </body></html>"#,
        )
        .pdf(OMEPRAZOLE_COA, b"batch 4 assay 99.8%")
        .pdf(
            OMEPRAZOLE_COO,
            b"CERTIFICATE OF ORIGIN\nProduct: Omeprazole CRS\nCountry of origin: France\n",
        )
}

fn glycerol() -> FakeTransport {
    FakeTransport::new()
        .html(
            GLYCEROL_PAGE,
            r#"<h1>G0400006 Glycerol</h1>
               <a href="/docs/G0400006_coa.pdf">Certificate of Analysis</a>"#,
        )
        .pdf(GLYCEROL_COA, b"glycerol coa")
        .pdf(GLYCEROL_SIGMA, b"%PDF-1.4 sigma safety data sheet")
}

// =============================================================================
// SEARCH
// =============================================================================

#[tokio::test]
async fn test_search_resolves_links() {
    let dir = tempfile::tempdir().unwrap();
    let loader = EdqmLoader::with_transport(shared(omeprazole()), &test_config(dir.path()));

    let position = loader.search(" Y0001532 ").await.unwrap();

    assert_eq!(position.code, "Y0001532");
    assert_eq!(position.link(DocumentKind::Coa).unwrap().as_str(), OMEPRAZOLE_COA);
    assert_eq!(position.link(DocumentKind::Coo).unwrap().as_str(), OMEPRAZOLE_COO);
    assert!(position.link(DocumentKind::Msds).is_none());
    assert_eq!(position.metadata["product_url"], OMEPRAZOLE_PAGE);
}

#[tokio::test]
async fn test_unknown_code_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let loader = EdqmLoader::with_transport(shared(FakeTransport::new()), &test_config(dir.path()));

    let err = loader.search("Y9999999").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_page_without_code_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new().html(
        "https://crs.edqm.eu/db/4DCGI/View=Y7777777",
        "<html><body>No matching reference standard</body></html>",
    );
    let loader = EdqmLoader::with_transport(shared(transport), &test_config(dir.path()));

    assert!(loader.search("Y7777777").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_search_transport_failure_is_network_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new().fail(OMEPRAZOLE_PAGE);
    let loader = EdqmLoader::with_transport(shared(transport), &test_config(dir.path()));

    let err = loader.search("Y0001532").await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_longer_code_on_page_is_not_a_match() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new().html(
        "https://crs.edqm.eu/db/4DCGI/View=Y000153",
        r#"<h1>Y0001532 Omeprazole CRS</h1>
           <a href="/docs/Y0001532_coa.pdf">Certificate of Analysis</a>"#,
    );
    let loader = EdqmLoader::with_transport(shared(transport), &test_config(dir.path()));

    assert!(loader.search("Y000153").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_search_page_echoing_code_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new().html(
        "https://crs.edqm.eu/db/4DCGI/View=Y7777777",
        "<html><body><p>No reference standard matches 'Y7777777'</p></body></html>",
    );
    let loader = EdqmLoader::with_transport(shared(transport), &test_config(dir.path()));

    assert!(loader.search("Y7777777").await.unwrap_err().is_not_found());
}

// =============================================================================
// DOCUMENTS
// =============================================================================

#[tokio::test]
async fn test_coo_named_after_detected_country() {
    let dir = tempfile::tempdir().unwrap();
    let loader = EdqmLoader::with_transport(shared(omeprazole()), &test_config(dir.path()));

    let report = retrieve(&loader, "Y0001532", &[DocumentKind::Coa, DocumentKind::Coo]).await;

    assert_eq!(report.status, CodeStatus::Complete);
    let names: Vec<String> = report.files().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["Y0001532_COA.pdf", "France.pdf"]);

    let coo = dir.path().join("edqm").join("France.pdf");
    assert!(coo.is_file());
    assert!(std::fs::read_to_string(coo).unwrap().contains("France"));
}

#[tokio::test]
async fn test_coo_without_country_keeps_code_name() {
    let dir = tempfile::tempdir().unwrap();
    let transport = omeprazole().pdf(OMEPRAZOLE_COO, b"certificate issued by the manufacturer");
    let loader = EdqmLoader::with_transport(shared(transport), &test_config(dir.path()));
    let position = loader.search("Y0001532").await.unwrap();

    let retrieved = loader.download_coo(&position).await.unwrap();

    assert_eq!(retrieved.file().unwrap().name, "Y0001532_COO.pdf");
}

#[tokio::test]
async fn test_coo_collision_appends_code() {
    let dir = tempfile::tempdir().unwrap();
    let edqm_dir = dir.path().join("edqm");
    std::fs::create_dir_all(&edqm_dir).unwrap();
    std::fs::write(edqm_dir.join("France.pdf"), b"another certificate").unwrap();

    let loader = EdqmLoader::with_transport(shared(omeprazole()), &test_config(dir.path()));
    let position = loader.search("Y0001532").await.unwrap();
    let retrieved = loader.download_coo(&position).await.unwrap();

    assert_eq!(retrieved.file().unwrap().name, "France_Y0001532.pdf");
    assert_eq!(
        std::fs::read(edqm_dir.join("France.pdf")).unwrap(),
        b"another certificate"
    );
}

#[tokio::test]
async fn test_missing_msds_tries_sigma_first() {
    let dir = tempfile::tempdir().unwrap();
    let transport = shared(omeprazole());
    let loader = EdqmLoader::with_transport(transport.clone(), &test_config(dir.path()));
    let position = loader.search("Y0001532").await.unwrap();

    let retrieved = loader.download_msds(&position).await.unwrap();

    assert!(matches!(retrieved, Retrieved::Missing(_)));
    assert!(transport.requested(OMEPRAZOLE_SIGMA));
}

#[tokio::test]
async fn test_sigma_fallback_saved_with_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let loader = EdqmLoader::with_transport(shared(glycerol()), &test_config(dir.path()));

    let report = retrieve(&loader, "G0400006", &[]).await;

    assert_eq!(report.status, CodeStatus::Partial);
    let msds = report
        .documents
        .iter()
        .find(|d| d.kind == DocumentKind::Msds)
        .and_then(|d| d.file())
        .unwrap();
    assert_eq!(msds.name, "G0400006_MSDS_sigma.pdf");
    assert_eq!(msds.origin, FileOrigin::Sigma);
    assert!(dir.path().join("edqm/G0400006_MSDS_sigma.pdf").is_file());
}

#[tokio::test]
async fn test_sigma_html_page_is_not_an_sds() {
    let dir = tempfile::tempdir().unwrap();
    let transport = glycerol().html(GLYCEROL_SIGMA, "<html>Product not found</html>");
    let loader = EdqmLoader::with_transport(shared(transport), &test_config(dir.path()));
    let position = loader.search("G0400006").await.unwrap();

    let retrieved = loader.download_msds(&position).await.unwrap();

    assert!(matches!(retrieved, Retrieved::Missing(_)));
}

#[tokio::test]
async fn test_document_failures_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let transport = omeprazole().route(OMEPRAZOLE_COA, 500, "text/html", "Internal Server Error");
    let loader = EdqmLoader::with_transport(shared(transport), &test_config(dir.path()));

    let report = retrieve(&loader, "Y0001532", &[]).await;

    assert_eq!(report.status, CodeStatus::Partial);
    let statuses: Vec<_> = report.documents.iter().map(|d| (d.kind, &d.status)).collect();
    assert!(matches!(statuses[0], (DocumentKind::Coa, DocumentStatus::Failed { .. })));
    assert!(matches!(statuses[1], (DocumentKind::Msds, DocumentStatus::Missing { .. })));
    assert!(matches!(statuses[2], (DocumentKind::Coo, DocumentStatus::Saved { .. })));
}

#[tokio::test]
async fn test_coo_extension_follows_html_original() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeTransport::new()
        .html(
            OMEPRAZOLE_PAGE,
            r#"<h1>Y0001532</h1>
               <a href="/db/4DCGI/Origin=Y0001532">Certificate of Origin</a>"#,
        )
        .html(
            "https://crs.edqm.eu/db/4DCGI/Origin=Y0001532",
            "<html><p>Country of origin: France</p></html>",
        );
    let loader = EdqmLoader::with_transport(shared(transport), &test_config(dir.path()));
    let position = loader.search("Y0001532").await.unwrap();

    let retrieved = loader.download_coo(&position).await.unwrap();

    assert_eq!(retrieved.file().unwrap().name, "France.html");
    assert!(dir.path().join("edqm/France.html").is_file());
}

// =============================================================================
// SIGMA FALLBACK FOR UNAVAILABLE EDQM SDS
// =============================================================================

fn glycerol_with_sds(status: u16, body: &[u8]) -> FakeTransport {
    glycerol()
        .html(
            GLYCEROL_PAGE,
            r#"<h1>G0400006 Glycerol</h1>
               <a href="/docs/G0400006_coa.pdf">Certificate of Analysis</a>
               <a href="/docs/G0400006_sds.pdf">Safety Data Sheet</a>"#,
        )
        .route(GLYCEROL_SDS, status, "application/pdf", body.to_vec())
}

async fn msds_name(transport: FakeTransport) -> String {
    let dir = tempfile::tempdir().unwrap();
    let transport = shared(transport);
    let loader = EdqmLoader::with_transport(transport.clone(), &test_config(dir.path()));
    let position = loader.search("G0400006").await.unwrap();
    assert!(position.link(DocumentKind::Msds).is_some());

    let retrieved = loader.download_msds(&position).await.unwrap();

    assert!(transport.requested(GLYCEROL_SDS));
    let file = retrieved.file().unwrap();
    assert_eq!(file.origin, FileOrigin::Sigma);
    file.name.clone()
}

#[tokio::test]
async fn test_sds_link_not_found_falls_back_to_sigma() {
    assert_eq!(
        msds_name(glycerol_with_sds(404, b"")).await,
        "G0400006_MSDS_sigma.pdf"
    );
}

#[tokio::test]
async fn test_sds_link_gone_falls_back_to_sigma() {
    assert_eq!(
        msds_name(glycerol_with_sds(410, b"gone")).await,
        "G0400006_MSDS_sigma.pdf"
    );
}

#[tokio::test]
async fn test_empty_sds_body_falls_back_to_sigma() {
    assert_eq!(
        msds_name(glycerol_with_sds(200, b"")).await,
        "G0400006_MSDS_sigma.pdf"
    );
}
