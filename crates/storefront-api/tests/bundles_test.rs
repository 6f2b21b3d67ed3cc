//! Bundle API integration tests.
//!
//! Run with: `cargo test -p storefront-api --test bundles_test`

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use helpers::{api_path, setup_test_app};
use serde_json::{json, Value};

async fn upload(client: &TestServer, surface: &str, owner: &str, position: Option<i32>) -> Value {
    let jpeg = helpers::fixtures::create_test_jpeg(640, 480);
    let part = Part::bytes(bytes::Bytes::from(jpeg))
        .file_name("Trail Shoe.jpg")
        .mime_type("image/jpeg");
    let mut form = MultipartForm::new()
        .add_text("ownerEntityId", owner.to_string())
        .add_part("file", part);
    if let Some(position) = position {
        form = form.add_text("position", position.to_string());
    }

    let response = client
        .post(&api_path(&format!("/{}/images", surface)))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    response.json()
}

async fn list(client: &TestServer, surface: &str, owner: &str) -> Vec<Value> {
    let response = client
        .get(&api_path(&format!("/{}/images", surface)))
        .add_query_param("ownerEntityId", owner)
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    body["bundles"].as_array().cloned().unwrap_or_default()
}

fn bundle_ids(bundles: &[Value]) -> Vec<String> {
    bundles
        .iter()
        .map(|b| b["bundleId"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_upload_returns_variant_paths_and_signed_urls() {
    let app = setup_test_app().await;
    let body = upload(app.client(), "products", "42", None).await;

    assert_eq!(body["position"], 0);
    let paths = body["paths"].as_object().unwrap();
    let mut names: Vec<&str> = paths.keys().map(String::as_str).collect();
    names.sort();
    assert_eq!(names, vec!["big", "small", "thumb"]);

    let bundle_id = body["bundleId"].as_str().unwrap();
    for path in paths.values() {
        let path = path.as_str().unwrap();
        assert!(path.starts_with(&format!("product-images/42/{}/", bundle_id)));
        assert!(path.ends_with("-Trail_Shoe.jpg"));
    }

    let thumb_url = body["urls"]["thumb"].as_str().unwrap();
    assert!(thumb_url.starts_with(helpers::TEST_BASE_URL));
    assert!(thumb_url.contains("signature="));
    assert_eq!(app.stored_file_count(), 3);
}

#[tokio::test]
async fn test_signed_media_url_serves_variant() {
    let app = setup_test_app().await;
    let body = upload(app.client(), "pages", "home", None).await;
    let url = body["urls"]["thumb"].as_str().unwrap();

    let (path, query) = url
        .strip_prefix("http://localhost:4000")
        .unwrap()
        .split_once('?')
        .unwrap();
    let mut request = app.client().get(path);
    for pair in query.split('&') {
        let (k, v) = pair.split_once('=').unwrap();
        request = request.add_query_param(k, v);
    }
    let response = request.await;
    assert_eq!(response.status_code(), 200);
    let served = response.as_bytes();
    assert_eq!(image::guess_format(served).unwrap(), image::ImageFormat::Jpeg);

    let tampered = app
        .client()
        .get(path)
        .add_query_param("expires", "9999999999")
        .add_query_param("signature", "00")
        .await;
    assert_eq!(tampered.status_code(), 403);
}

#[tokio::test]
async fn test_upload_requires_owner_and_file() {
    let app = setup_test_app().await;

    let jpeg = helpers::fixtures::create_test_jpeg(32, 32);
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes::Bytes::from(jpeg)).file_name("a.jpg"),
    );
    let response = app
        .client()
        .post(&api_path("/products/images"))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 400);

    let form = MultipartForm::new().add_text("ownerEntityId", "42");
    let response = app
        .client()
        .post(&api_path("/products/images"))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["error"].is_string());
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let app = setup_test_app().await;

    let oversized = vec![0u8; 3 * 1024 * 1024];
    let form = MultipartForm::new()
        .add_text("ownerEntityId", "42")
        .add_part(
            "file",
            Part::bytes(bytes::Bytes::from(oversized))
                .file_name("huge.jpg")
                .mime_type("image/jpeg"),
        );
    let response = app
        .client()
        .post(&api_path("/products/images"))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 413);
    assert_eq!(app.stored_file_count(), 0);
}

#[tokio::test]
async fn test_png_source_is_stored_as_jpeg() {
    let app = setup_test_app().await;
    let png = helpers::fixtures::create_test_png(300, 200);
    let form = MultipartForm::new()
        .add_text("ownerEntityId", "g1")
        .add_part(
            "file",
            Part::bytes(bytes::Bytes::from(png))
                .file_name("logo.png")
                .mime_type("image/png"),
        );

    let response = app
        .client()
        .post(&api_path("/gallery/images"))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert!(body["paths"]["thumb"]
        .as_str()
        .unwrap()
        .ends_with("-logo.jpg"));
}

#[tokio::test]
async fn test_unknown_surface_is_not_found() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get(&api_path("/categories/images"))
        .add_query_param("ownerEntityId", "1")
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_reorder_and_delete_keep_positions_contiguous() {
    let app = setup_test_app().await;
    let client = app.client();

    let a = upload(client, "products", "7", None).await;
    let b = upload(client, "products", "7", None).await;
    let c = upload(client, "products", "7", None).await;
    let ids: Vec<String> = [&a, &b, &c]
        .iter()
        .map(|v| v["bundleId"].as_str().unwrap().to_string())
        .collect();

    let response = client
        .post(&api_path("/products/images/reorder"))
        .json(&json!({
            "ownerEntityId": 7,
            "bundles": [
                { "bundleId": ids[2], "order": 0 },
                { "bundleId": ids[0], "order": 1 },
                { "bundleId": ids[1], "order": 2 }
            ]
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["ok"], true);

    let bundles = list(client, "products", "7").await;
    assert_eq!(bundle_ids(&bundles), vec![ids[2].clone(), ids[0].clone(), ids[1].clone()]);

    let response = client
        .delete(&api_path("/products/images"))
        .json(&json!({ "bundleId": ids[0] }))
        .await;
    assert_eq!(response.status_code(), 200);

    let bundles = list(client, "products", "7").await;
    assert_eq!(bundle_ids(&bundles), vec![ids[2].clone(), ids[1].clone()]);
    let positions: Vec<i64> = bundles.iter().map(|b| b["position"].as_i64().unwrap()).collect();
    assert_eq!(positions, vec![0, 1]);
    assert_eq!(app.stored_file_count(), 6);
}

#[tokio::test]
async fn test_incomplete_reorder_is_rejected() {
    let app = setup_test_app().await;
    let client = app.client();
    let a = upload(client, "collections", "summer", None).await;
    let b = upload(client, "collections", "summer", None).await;

    let response = client
        .post(&api_path("/collections/images/reorder"))
        .json(&json!({
            "ownerEntityId": "summer",
            "bundles": [{ "bundleId": b["bundleId"], "order": 0 }]
        }))
        .await;
    assert_eq!(response.status_code(), 409);

    let bundles = list(client, "collections", "summer").await;
    assert_eq!(
        bundle_ids(&bundles),
        vec![
            a["bundleId"].as_str().unwrap().to_string(),
            b["bundleId"].as_str().unwrap().to_string()
        ]
    );
}

#[tokio::test]
async fn test_post_delete_alias_and_unknown_bundle() {
    let app = setup_test_app().await;
    let client = app.client();
    let a = upload(client, "pages", "about", None).await;

    let response = client
        .post(&api_path("/pages/images/delete"))
        .json(&json!({ "bundleId": a["bundleId"] }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(list(client, "pages", "about").await.is_empty());
    assert_eq!(app.stored_file_count(), 0);

    let response = client
        .post(&api_path("/pages/images/delete"))
        .json(&json!({ "bundleId": a["bundleId"] }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_insert_at_position() {
    let app = setup_test_app().await;
    let client = app.client();
    let a = upload(client, "products", "9", None).await;
    let b = upload(client, "products", "9", Some(0)).await;
    assert_eq!(b["position"], 0);

    let bundles = list(client, "products", "9").await;
    assert_eq!(
        bundle_ids(&bundles),
        vec![
            b["bundleId"].as_str().unwrap().to_string(),
            a["bundleId"].as_str().unwrap().to_string()
        ]
    );
}

#[tokio::test]
async fn test_sign_endpoint_passes_through_and_signs() {
    let app = setup_test_app().await;
    let client = app.client();
    let body = upload(client, "products", "5", None).await;
    let stored = body["paths"]["small"].as_str().unwrap().to_string();
    let foreign = "https://cdn.example.com/banner.png".to_string();
    let proxied = format!("/api/images/{}", stored);

    let response = client
        .post(&api_path("/media/sign"))
        .json(&json!({ "paths": [stored, foreign, proxied, "  "] }))
        .await;
    assert_eq!(response.status_code(), 200);
    let urls = &response.json::<Value>()["urls"];

    assert!(urls[&stored].as_str().unwrap().contains("signature="));
    assert_eq!(urls[&foreign], foreign.as_str());
    assert!(urls[&proxied].as_str().unwrap().contains("signature="));
    assert!(urls["  "].is_null());
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;
    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["storage"], "local");
    assert_eq!(body["database"], "in-memory");
}
