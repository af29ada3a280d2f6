//! Integration tests for the multipart transfer client against a mock service

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use swot_workbench::{
    AnalysisBackend, ApiClient, ApiKey, ActionPlanRequest, MultipartField,
    QuestionGenerationRequest, SwotRequest, SwotResult, TransferError, UploadFile,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::new(server.uri()).unwrap();
    (server, client)
}

fn swot_request(pdfs: &[&str]) -> SwotRequest {
    SwotRequest {
        csv_file: UploadFile::new("profile.csv", "Business Name (pas de caractères spéciaux)\nAcme"),
        pdf_files: pdfs
            .iter()
            .map(|name| UploadFile::new(*name, format!("%PDF-1.4 {}", name)))
            .collect(),
        business_name: "Acme".into(),
        api_key: ApiKey::new("sk-test"),
    }
}

async fn last_body(server: &MockServer) -> String {
    let requests = server.received_requests().await.unwrap();
    let request = requests.last().unwrap();
    String::from_utf8_lossy(&request.body).into_owned()
}

fn positions(haystack: &str, needle: &str) -> Vec<usize> {
    haystack.match_indices(needle).map(|(i, _)| i).collect()
}

#[tokio::test]
async fn test_swot_result_mirrors_response() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/generate-swot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "swot_analysis": "S",
            "pdf_id": "abc",
            "business_name": "Acme",
            "files_count": 2,
            "processed_files": ["a.pdf", "b.pdf"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client.generate_swot(&swot_request(&["a.pdf", "b.pdf"])).await.unwrap();

    assert_eq!(
        result,
        SwotResult {
            business_name: "Acme".into(),
            files_count: 2,
            processed_files: vec!["a.pdf".into(), "b.pdf".into()],
            swot_analysis: "S".into(),
            pdf_id: "abc".into(),
        }
    );
}

#[tokio::test]
async fn test_pdf_parts_are_repeated_in_order() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/generate-swot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "swot_analysis": "S", "pdf_id": "abc", "business_name": "Acme",
            "files_count": 3, "processed_files": []
        })))
        .mount(&server)
        .await;

    client
        .generate_swot(&swot_request(&["b.pdf", "a.pdf", "b.pdf"]))
        .await
        .unwrap();
    let body = last_body(&server).await;

    assert_eq!(positions(&body, "name=\"pdf_files\"").len(), 3);
    let a = positions(&body, "filename=\"a.pdf\"");
    let b = positions(&body, "filename=\"b.pdf\"");
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 2);
    assert!(b[0] < a[0] && a[0] < b[1]);

    let csv = positions(&body, "name=\"csv_file\"")[0];
    let api_key = positions(&body, "name=\"api_key\"")[0];
    assert!(csv < b[0]);
    assert!(api_key > b[1]);
    assert!(body.contains("sk-test"));
}

#[tokio::test]
async fn test_action_plan_sends_swot_analysis() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/generate-action-plan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "business_name": "Acme",
            "action_plan": "Déployer un outil de scoring",
            "processed_files": ["a.pdf"],
            "files_count": 1,
            "action_pdf_id": "plan-1",
            "comprehensive_pdf_id": "full-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ActionPlanRequest {
        swot: swot_request(&["a.pdf"]),
        swot_analysis: "Forces: proximité client".into(),
    };
    let result = client.generate_action_plan(&request).await.unwrap();
    assert_eq!(result.action_pdf_id, "plan-1");
    assert_eq!(result.comprehensive_pdf_id, "full-1");

    let body = last_body(&server).await;
    let analysis = positions(&body, "name=\"swot_analysis\"");
    assert_eq!(analysis.len(), 1);
    assert!(body.contains("Forces: proximité client"));
    assert!(positions(&body, "name=\"business_name\"")[0] < analysis[0]);
    assert!(analysis[0] < positions(&body, "name=\"api_key\"")[0]);
}

#[tokio::test]
async fn test_nested_detail_message_is_surfaced() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/generate-questions"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": { "message": "bad key" } })),
        )
        .mount(&server)
        .await;

    let request = QuestionGenerationRequest {
        csv_file: UploadFile::new("profile.csv", "x"),
        business_name: "Acme".into(),
        api_key: ApiKey::new("sk-wrong"),
    };
    let err = client.generate_questions(&request).await.unwrap_err();

    assert_eq!(err.to_string(), "bad key");
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_flat_detail_is_surfaced() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/generate-swot"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "detail": "rate limited" })))
        .mount(&server)
        .await;

    let err = client.generate_swot(&swot_request(&["a.pdf"])).await.unwrap_err();
    assert_eq!(err.to_string(), "rate limited");
}

#[tokio::test]
async fn test_unknown_business_carries_suggestions() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/generate-swot"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "detail": {
                "message": "No responses found for business 'Acme'",
                "available_businesses": ["Acme SAS", "Globex"]
            }
        })))
        .mount(&server)
        .await;

    let err = client.generate_swot(&swot_request(&["a.pdf"])).await.unwrap_err();
    assert_matches!(
        err,
        TransferError::Server { status: 404, ref message, ref available_businesses }
            if message == "No responses found for business 'Acme'"
                && available_businesses == &vec!["Acme SAS".to_string(), "Globex".to_string()]
    );
}

#[tokio::test]
async fn test_plain_text_error_uses_fallback() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/generate-action-plan"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let request = ActionPlanRequest {
        swot: swot_request(&["a.pdf"]),
        swot_analysis: "S".into(),
    };
    let err = client.generate_action_plan(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "Error generating action plan");
}

#[tokio::test]
async fn test_post_multipart_returns_status_and_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/echo"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "detail": [] })))
        .mount(&server)
        .await;

    let response = client
        .post_multipart(
            "/api/echo",
            vec![
                ("business_name", MultipartField::Text("Acme".into())),
                ("pdf_files", MultipartField::Files(Vec::new())),
            ],
        )
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 422);
    assert_eq!(response.body, json!({ "detail": [] }));
}

#[tokio::test]
async fn test_download_writes_file() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("reports").join("Acme_analyse_SWOT.pdf");

    Mock::given(method("GET"))
        .and(path("/api/download-pdf/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4 swot".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let saved = client.download_pdf("abc", &destination).await.unwrap();

    assert_eq!(saved, destination);
    assert_eq!(std::fs::read(&destination).unwrap(), b"%PDF-1.4 swot");
    assert!(!dir.path().join("reports").join("Acme_analyse_SWOT.pdf.part").exists());
}

#[tokio::test]
async fn test_download_404_saves_nothing() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("missing.pdf");

    Mock::given(method("GET"))
        .and(path("/api/download-pdf/gone"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "PDF not found or expired" })),
        )
        .mount(&server)
        .await;

    let err = client.download_pdf("gone", &destination).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to download PDF");
    assert_matches!(err, TransferError::Download { .. });
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_download_that_cannot_be_finalised_leaves_no_partial_file() {
    let (server, client) = setup().await;
    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory at the destination makes the final rename fail.
    let destination = dir.path().join("Acme_analyse_SWOT.pdf");
    std::fs::create_dir(&destination).unwrap();
    std::fs::write(destination.join("keep.txt"), "x").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/download-pdf/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 swot".to_vec()))
        .mount(&server)
        .await;

    let err = client.download_pdf("abc", &destination).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to download PDF");
    assert!(!dir.path().join("Acme_analyse_SWOT.pdf.part").exists());
    assert!(destination.is_dir());
}

#[tokio::test]
async fn test_transport_failure_surfaces_underlying_error() {
    // Nothing listens on the discard port.
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();

    let err = client.generate_swot(&swot_request(&["a.pdf"])).await.unwrap_err();

    assert_matches!(err, TransferError::Transport(_));
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn test_health() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "message": "AI Business Analysis API is running"
        })))
        .mount(&server)
        .await;

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "OK");
}
