//! The admin HTTP API over a real socket, backed by the mock contents API.
//!
//! Run with: cargo test -p artistic-gurl-integration-tests

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use artistic_gurl_admin::{AppState, ContentStore, InMemoryCredentialStore, routes};
use artistic_gurl_integration_tests::{MockContentsApi, TOKEN, credential, sample_document};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// A running admin API plus the contents API behind it.
struct Harness {
    api: MockContentsApi,
    base_url: String,
    client: Client,
    server: JoinHandle<()>,
}

impl Harness {
    async fn start(with_credential: bool) -> Self {
        let api = MockContentsApi::with_document(&sample_document()).await;
        let credentials = InMemoryCredentialStore::new(with_credential.then(credential));
        let state = AppState::new(api.store(), Arc::new(credentials));
        let app = routes::routes().with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api,
            base_url: format!("http://{addr}"),
            client: Client::new(),
            server,
        }
    }

    async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.client.request(method, format!("{}{path}", self.base_url));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.unwrap();
        let status = response.status();
        let text = response.text().await.unwrap();
        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        (status, value)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[tokio::test]
async fn test_hydrate_edit_save_over_http() {
    let h = Harness::start(true).await;

    let (status, body) = h.call(reqwest::Method::POST, "/api/session/hydrate", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let first_token = body["token"].as_str().unwrap().to_string();

    let (status, _) = h
        .call(
            reqwest::Method::PATCH,
            "/api/session/fields",
            Some(json!({ "field": "siteConfig.announcement", "value": "Eid orders close Friday" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, product) = h
        .call(reqwest::Method::POST, "/api/session/products", None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["id"], 8);

    let (status, body) = h.call(reqwest::Method::POST, "/api/session/save", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_ne!(body["token"].as_str().unwrap(), first_token);

    let snapshot = h.api.store().fetch_document(&credential()).await.unwrap();
    assert_eq!(
        snapshot.document.site_config.announcement,
        "Eid orders close Friday"
    );
    assert_eq!(snapshot.document.products.len(), 3);
}

#[tokio::test]
async fn test_remote_change_surfaces_as_conflict() {
    let h = Harness::start(true).await;
    h.call(reqwest::Method::POST, "/api/session/hydrate", None).await;
    h.call(reqwest::Method::DELETE, "/api/session/products/1", None)
        .await;

    // another editor commits first
    let other = h.api.store();
    let snapshot = other.fetch_document(&credential()).await.unwrap();
    let mut document = snapshot.document;
    document.site_config.title = "Artistic Gurl Studio".to_string();
    other
        .save_document(&credential(), &document, &snapshot.token)
        .await
        .unwrap();

    let (status, body) = h.call(reqwest::Method::POST, "/api/session/save", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, view) = h.call(reqwest::Method::GET, "/api/session", None).await;
    assert_eq!(view["state"], "conflict_pending");
    assert_eq!(view["document"]["products"].as_array().unwrap().len(), 1);

    let (status, _) = h
        .call(reqwest::Method::POST, "/api/session/adopt-remote-version", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call(reqwest::Method::POST, "/api/session/save", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_credential_flow() {
    let h = Harness::start(false).await;

    let (status, body) = h.call(reqwest::Method::POST, "/api/session/hydrate", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = h
        .call(
            reqwest::Method::PUT,
            "/api/credential",
            Some(json!({ "token": "ghp_wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = h.call(reqwest::Method::POST, "/api/session/hydrate", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    h.call(
        reqwest::Method::PUT,
        "/api/credential",
        Some(json!({ "token": TOKEN })),
    )
    .await;
    let (status, body) = h.call(reqwest::Method::POST, "/api/session/hydrate", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_gallery_over_http() {
    let h = Harness::start(true).await;
    h.call(reqwest::Method::POST, "/api/session/hydrate", None).await;

    let (status, body) = h
        .call(reqwest::Method::GET, "/api/gallery?category=Birthday", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"], json!(["All", "Love", "Birthday"]));
    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["id"], 7);
}

#[tokio::test]
async fn test_upload_racing_a_save_is_not_lost() {
    let h = Harness::start(true).await;
    h.call(reqwest::Method::POST, "/api/session/hydrate", None).await;
    h.call(
        reqwest::Method::PATCH,
        "/api/session/fields",
        Some(json!({ "field": "siteConfig.heroTitle", "value": "Wrapped with love" })),
    )
    .await;

    // every contents call now takes a while, so the save starts while the
    // image commit is still in flight
    h.api.set_delay(Duration::from_millis(300));
    let upload = async {
        let part = Part::bytes(b"\x89PNG\r\n\x1a\n".to_vec()).file_name("heart card.png");
        let response = h
            .client
            .post(format!("{}/api/session/products/7/image", h.base_url))
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json::<Value>().await.unwrap()
    };
    let save = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.call(reqwest::Method::POST, "/api/session/save", None).await
    };
    let (outcome, (save_status, _)) = tokio::join!(upload, save);
    assert_eq!(save_status, StatusCode::OK);
    assert_eq!(outcome["attached"], true);
    let reference = outcome["reference"].as_str().unwrap().to_string();

    let (_, view) = h.call(reqwest::Method::GET, "/api/session", None).await;
    assert_eq!(view["state"], "dirty");
    assert_eq!(view["pending_images"], 0);
    let product = view["document"]["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == 7)
        .unwrap()
        .clone();
    assert_eq!(product["image"], reference.as_str());

    h.api.set_delay(Duration::ZERO);
    let (status, _) = h.call(reqwest::Method::POST, "/api/session/save", None).await;
    assert_eq!(status, StatusCode::OK);
    let snapshot = h.api.store().fetch_document(&credential()).await.unwrap();
    let saved = snapshot.document.products.iter().find(|p| p.id.get() == 7).unwrap();
    assert_eq!(saved.image.as_deref(), Some(reference.as_str()));
}
