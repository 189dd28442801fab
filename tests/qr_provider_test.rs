use std::time::Duration;

use assert_matches::assert_matches;
use gym_portal::services::{QrProvider, QrRenderer};
use gym_portal::AppError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn provider(server: &MockServer, template: QrProvider, route: &str) -> QrProvider {
    template.with_base_url(format!("{}{}", server.uri(), route))
}

#[tokio::test]
async fn test_first_healthy_provider_wins() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/qrserver"))
        .and(query_param("data", "hello"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_MAGIC.to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quickchart"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_MAGIC.to_vec(), "image/png"))
        .expect(0)
        .mount(&server)
        .await;

    let renderer = QrRenderer::new(
        vec![
            provider(&server, QrProvider::qrserver(), "/qrserver"),
            provider(&server, QrProvider::quickchart(), "/quickchart"),
        ],
        Duration::from_secs(2),
    )
    .unwrap();

    let rendered = renderer.render("hello").await.unwrap();
    assert_eq!(rendered.provider, "qrserver");
    assert_eq!(rendered.content_type, "image/png");
    assert_eq!(rendered.image.as_ref(), PNG_MAGIC);
}

#[tokio::test]
async fn test_falls_back_when_provider_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/qrserver"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quickchart"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/google"))
        .and(query_param("cht", "qr"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PNG_MAGIC.to_vec(), "image/png"))
        .mount(&server)
        .await;

    let renderer = QrRenderer::new(
        vec![
            provider(&server, QrProvider::qrserver(), "/qrserver"),
            provider(&server, QrProvider::quickchart(), "/quickchart"),
            provider(&server, QrProvider::google_charts(), "/google"),
        ],
        Duration::from_secs(2),
    )
    .unwrap();

    let rendered = renderer.render("member-payload").await.unwrap();
    assert_eq!(rendered.provider, "google");
}

#[tokio::test]
async fn test_all_providers_failing_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::<u8>::new(), "image/png"))
        .with_priority(1)
        .mount(&server)
        .await;

    let renderer = QrRenderer::new(
        vec![
            provider(&server, QrProvider::qrserver(), "/broken"),
            provider(&server, QrProvider::quickchart(), "/empty"),
        ],
        Duration::from_secs(2),
    )
    .unwrap();

    let err = renderer.render("payload").await.unwrap_err();
    assert_matches!(err, AppError::Upstream(_));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_no_providers_configured() {
    let renderer = QrRenderer::new(Vec::new(), Duration::from_secs(1)).unwrap();
    assert_matches!(renderer.render("x").await, Err(AppError::Upstream(_)));
    assert_matches!(renderer.primary_image_url("x"), Err(AppError::Upstream(_)));
}
