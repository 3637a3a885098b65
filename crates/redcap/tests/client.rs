//! End-to-end orchestrator tests against a scripted in-process transport.
//!
//! Every test drives a real [`RedcapClient`] through the full pipeline —
//! parameter building, adapter transform, form encoding, classification —
//! with only the HTTP exchange replaced by a double.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redcap::{
    Email, ExportOptions, FieldName, ImportOptions, ImportReceipt, InstrumentName, RecordId,
    RedcapClient, RedcapError, Token, Transport, TransportFailure, Version, WireRequest,
    WireResponse,
};
use url::Url;

// ---------------------------------------------------------------------------
// Scripted transport double
// ---------------------------------------------------------------------------

struct MockTransport {
    requests: Mutex<Vec<WireRequest>>,
    script: Mutex<VecDeque<Result<WireResponse, TransportFailure>>>,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
        })
    }

    fn push(&self, outcome: Result<WireResponse, TransportFailure>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    fn push_ok(&self, status: u16, body: &str) {
        self.push(Ok(WireResponse {
            status,
            status_text: reason(status).to_string(),
            url: Some("https://redcap.example.org/api/".to_string()),
            body: Some(body.as_bytes().to_vec()),
        }));
    }

    fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn last_body(&self) -> String {
        self.requests().last().expect("no request captured").body.clone()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        _ => "",
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportFailure> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more times than scripted")
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn fixture_token() -> Token {
    Token::new_unchecked("A1B2C3D4E5F67890A1B2C3D4E5F67890")
}

fn client_at(version: Version, transport: Arc<MockTransport>) -> RedcapClient {
    RedcapClient::with_version(
        Url::parse("https://redcap.example.org/api/").unwrap(),
        fixture_token(),
        transport,
        version,
    )
    .unwrap()
}

fn v15_client(transport: Arc<MockTransport>) -> RedcapClient {
    client_at(Version::new(15, 2, 0), transport)
}

// ---------------------------------------------------------------------------
// Request construction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_travels_in_the_body_not_a_header() {
    let transport = MockTransport::new();
    transport.push_ok(200, "[]");
    let client = v15_client(transport.clone());

    client.export_records(&ExportOptions::default()).await.unwrap();

    let request = transport.requests().pop().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.content_type, "application/x-www-form-urlencoded");
    assert!(request.body.contains("token=A1B2C3D4E5F67890A1B2C3D4E5F67890"));
}

#[tokio::test]
async fn export_request_carries_indexed_fields_and_defaults() {
    let transport = MockTransport::new();
    transport.push_ok(200, "[]");
    let client = v15_client(transport.clone());

    let options = ExportOptions {
        fields: vec![
            FieldName::new_unchecked("record_id"),
            FieldName::new_unchecked("name"),
        ],
        ..Default::default()
    };
    client.export_records(&options).await.unwrap();

    let body = transport.last_body();
    assert!(body.contains("fields%5B0%5D=record_id"));
    assert!(body.contains("fields%5B1%5D=name"));
    assert!(body.contains("content=record"));
    assert!(body.contains("type=flat"));
    assert!(!body.contains("filterLogic"));
}

#[tokio::test]
async fn v14_band_pins_return_format_on_exports() {
    let transport = MockTransport::new();
    transport.push_ok(200, "[]");
    let client = client_at(Version::new(14, 5, 10), transport.clone());

    client.export_records(&ExportOptions::default()).await.unwrap();

    assert!(transport.last_body().contains("returnFormat=json"));
}

#[tokio::test]
async fn find_user_escapes_email_before_encoding() {
    let transport = MockTransport::new();
    transport.push_ok(200, r#"[{"user_id": "jdoe"}]"#);
    let client = v15_client(transport.clone());

    let email = Email::new_unchecked(r#"test"injection@example.com"#);
    let found = client.find_user_id_by_email(&email).await.unwrap();
    assert_eq!(found.map(|u| u.as_str().to_string()), Some("jdoe".into()));

    // The quote is backslash-escaped first, then the pair percent-encodes:
    // `\"` becomes %5C%22 inside the filterLogic value.
    let body = transport.last_body();
    assert!(body.contains("filterLogic="));
    assert!(body.contains("test%5C%22injection%40example.com"));
}

#[tokio::test]
async fn find_user_not_found_is_a_value() {
    let transport = MockTransport::new();
    transport.push_ok(200, "[]");
    let client = v15_client(transport.clone());

    let email = Email::new_unchecked("absent@example.org");
    assert_eq!(client.find_user_id_by_email(&email).await.unwrap(), None);
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_rejection_classifies_as_network() {
    let transport = MockTransport::new();
    transport.push(Err(TransportFailure {
        cause: "tcp connect error: ECONNREFUSED".to_string(),
        url: Some("https://redcap.example.org/api/".to_string()),
    }));
    let client = v15_client(transport);

    let err = client.get_project_info().await.unwrap_err();
    assert!(matches!(err, RedcapError::Network { .. }));
    assert!(err.is_connection_refused());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn status_429_classifies_as_retryable_rate_limit() {
    let transport = MockTransport::new();
    transport.push_ok(429, "slow down");
    let client = v15_client(transport);

    let err = client.get_instruments().await.unwrap_err();
    match &err {
        RedcapError::Http { status, body, .. } => {
            assert_eq!(*status, 429);
            assert_eq!(body.as_deref(), Some("slow down"));
        }
        other => panic!("expected Http, got {other:?}"),
    }
    assert!(err.is_rate_limit_error());
    assert!(err.is_retryable());
}

#[tokio::test]
async fn status_404_is_not_retryable() {
    let transport = MockTransport::new();
    transport.push_ok(404, "");
    let client = v15_client(transport);

    let err = client.get_fields().await.unwrap_err();
    assert!(matches!(err, RedcapError::Http { status: 404, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn embedded_error_in_a_200_classifies_as_api() {
    let transport = MockTransport::new();
    transport.push_ok(200, r#"{"error": "Invalid token"}"#);
    let client = v15_client(transport);

    let err = client.export_records(&ExportOptions::default()).await.unwrap_err();
    match &err {
        RedcapError::Api { message, status, .. } => {
            assert_eq!(message, "Invalid token");
            assert_eq!(*status, Some(200));
        }
        other => panic!("expected Api, got {other:?}"),
    }
    assert!(err.is_invalid_token());
    assert!(!err.is_retryable());
}

// ---------------------------------------------------------------------------
// Payload decoding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_version_parses_the_plain_text_body() {
    let transport = MockTransport::new();
    transport.push_ok(200, "15.2.0\n");
    let client = v15_client(transport.clone());

    assert_eq!(client.get_version().await.unwrap(), Version::new(15, 2, 0));
    assert!(transport.last_body().contains("content=version"));
}

#[tokio::test]
async fn probe_resolves_the_adapter_from_the_server_version() {
    let transport = MockTransport::new();
    transport.push_ok(200, "15.2.0");

    let client = RedcapClient::probe(
        Url::parse("https://redcap.example.org/api/").unwrap(),
        fixture_token(),
        transport,
    )
    .await
    .unwrap();

    assert_eq!(client.version(), Version::new(15, 2, 0));
    assert!(client.supports("fileRepository", None));
    assert!(!client.supports("randomization", None));
}

#[tokio::test]
async fn probe_of_an_unsupported_version_fails_to_build() {
    let transport = MockTransport::new();
    transport.push_ok(200, "13.0.0");

    let result = RedcapClient::probe(
        Url::parse("https://redcap.example.org/api/").unwrap(),
        fixture_token(),
        transport,
    )
    .await;

    assert!(matches!(
        result,
        Err(redcap::ClientBuildError::Unsupported(err))
            if err.version == Version::new(13, 0, 0)
    ));
}

#[tokio::test]
async fn import_decodes_the_count_receipt() {
    let transport = MockTransport::new();
    transport.push_ok(200, r#"{"count": 2}"#);
    let client = v15_client(transport.clone());

    let records = vec![
        serde_json::json!({"record_id": "1001"}),
        serde_json::json!({"record_id": "1002"}),
    ];
    let receipt = client
        .import_records(&records, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(receipt, ImportReceipt::Count(2));
    let body = transport.last_body();
    assert!(body.contains("content=record"));
    assert!(body.contains("returnContent=count"));
    assert!(body.contains("data="));
}

#[tokio::test]
async fn survey_link_returns_trimmed_plain_text() {
    let transport = MockTransport::new();
    transport.push_ok(200, "https://redcap.example.org/surveys/?s=ABC123\n");
    let client = v15_client(transport.clone());

    let link = client
        .get_survey_link(
            &RecordId::new_unchecked("1001"),
            &InstrumentName::new_unchecked("followup_survey"),
        )
        .await
        .unwrap();

    assert_eq!(link, "https://redcap.example.org/surveys/?s=ABC123");
    let body = transport.last_body();
    assert!(body.contains("content=surveyLink"));
    assert!(body.contains("record=1001"));
    assert!(body.contains("instrument=followup_survey"));
}

#[tokio::test]
async fn pdf_download_returns_raw_bytes() {
    let transport = MockTransport::new();
    transport.push(Ok(WireResponse {
        status: 200,
        status_text: "OK".to_string(),
        url: None,
        body: Some(b"%PDF-1.7 not really".to_vec()),
    }));
    let client = v15_client(transport);

    let bytes = client
        .download_pdf(
            &RecordId::new_unchecked("1001"),
            &InstrumentName::new_unchecked("consent_form"),
        )
        .await
        .unwrap();

    assert_eq!(&bytes[..8], b"%PDF-1.7");
}

#[tokio::test]
async fn pdf_download_detects_a_smuggled_error() {
    let transport = MockTransport::new();
    transport.push_ok(200, r#"{"error": "You do not have permission to export PDFs"}"#);
    let client = v15_client(transport);

    let err = client
        .download_pdf(
            &RecordId::new_unchecked("1001"),
            &InstrumentName::new_unchecked("consent_form"),
        )
        .await
        .unwrap_err();
    assert!(err.is_permission_error());
}

#[tokio::test]
async fn malformed_success_payload_classifies_as_api() {
    let transport = MockTransport::new();
    transport.push_ok(200, "<html>maintenance page</html>");
    let client = v15_client(transport);

    let err = client.get_project_info().await.unwrap_err();
    match err {
        RedcapError::Api { message, .. } => assert!(message.contains("malformed")),
        other => panic!("expected Api, got {other:?}"),
    }
}
