//! End-to-end tests against the real router over TCP.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};

use pageturn::api::{self, ApiState};
use pageturn::PageStore;

/// Serve a fresh in-memory store on an ephemeral port.
async fn spawn_server() -> String {
    let store = PageStore::open_in_memory().unwrap();
    let app = api::router(Arc::new(ApiState::new(store)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn create_book(client: &reqwest::Client, base: &str, title: &str) -> String {
    let response = client
        .post(format!("{base}/api/v1/books"))
        .json(&json!({ "title": title }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let book: Value = response.json().await.unwrap();
    book["id"].as_str().unwrap().to_string()
}

async fn create_page(client: &reqwest::Client, base: &str, book: &str, position: i64) -> String {
    let response = client
        .post(format!("{base}/api/v1/books/{book}/pages"))
        .json(&json!({ "position": position, "text": format!("page {position}") }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let page: Value = response.json().await.unwrap();
    page["id"].as_str().unwrap().to_string()
}

fn ids_and_positions(pages: &Value) -> Vec<(String, i64)> {
    pages
        .as_array()
        .unwrap()
        .iter()
        .map(|p| {
            (
                p["id"].as_str().unwrap().to_string(),
                p["position"].as_i64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_reorder_rotates_pages() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let book = create_book(&client, &base, "Three Little Pages").await;
    let a = create_page(&client, &base, &book, 1).await;
    let b = create_page(&client, &base, &book, 2).await;
    let c = create_page(&client, &base, &book, 3).await;

    let response = client
        .post(format!("{base}/api/v1/pages/reorder"))
        .json(&json!({
            "parentId": book,
            "pageOrder": [
                { "pageId": a, "newPosition": 3 },
                { "pageId": b, "newPosition": 1 },
                { "pageId": c, "newPosition": 2 },
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: Value = response.json().await.unwrap();
    assert_eq!(result["requested"], 3);
    assert_eq!(result["applied"], 3);
    assert_eq!(result["skipped"], 0);

    let expected = vec![(b.clone(), 1), (c.clone(), 2), (a.clone(), 3)];
    assert_eq!(ids_and_positions(&result["pages"]), expected);

    // A fresh list agrees
    let listed: Value = client
        .get(format!("{base}/api/v1/books/{book}/pages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids_and_positions(&listed), expected);
}

#[tokio::test]
async fn test_reorder_partial_application() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let book = create_book(&client, &base, "Partial").await;
    let a = create_page(&client, &base, &book, 1).await;
    let b = create_page(&client, &base, &book, 2).await;

    let result: Value = client
        .post(format!("{base}/api/v1/pages/reorder"))
        .json(&json!({
            "parentId": book,
            "pageOrder": [
                { "pageId": a, "newPosition": 2 },
                { "pageId": "65a1f0c2e4b0a1b2c3d4e5f6", "newPosition": 9 },
                { "pageId": "bogus", "newPosition": 4 },
                { "pageId": b, "newPosition": 1 },
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["requested"], 4);
    assert_eq!(result["applied"], 2);
    assert_eq!(result["skipped"], 1);
    assert_eq!(ids_and_positions(&result["pages"]), vec![(b, 1), (a, 2)]);
}

#[tokio::test]
async fn test_reorder_ignores_missing_page_sharing_a_target() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let book = create_book(&client, &base, "Ghostly").await;
    let a = create_page(&client, &base, &book, 1).await;
    let c = create_page(&client, &base, &book, 2).await;

    let response = client
        .post(format!("{base}/api/v1/pages/reorder"))
        .json(&json!({
            "parentId": book,
            "pageOrder": [
                { "pageId": a, "newPosition": 2 },
                { "pageId": c, "newPosition": 1 },
                { "pageId": "65a1f0c2e4b0a1b2c3d4e5f6", "newPosition": 1 },
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result: Value = response.json().await.unwrap();
    assert_eq!(result["requested"], 3);
    assert_eq!(result["applied"], 2);
    assert_eq!(ids_and_positions(&result["pages"]), vec![(c, 1), (a, 2)]);
}

#[tokio::test]
async fn test_position_limit_rejected() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let book = create_book(&client, &base, "Too Long").await;
    let a = create_page(&client, &base, &book, 1).await;

    let response = client
        .post(format!("{base}/api/v1/books/{book}/pages"))
        .json(&json!({ "position": i64::MAX }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{base}/api/v1/pages/reorder"))
        .json(&json!({
            "parentId": book,
            "pageOrder": [{ "pageId": a, "newPosition": i64::MAX }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Appending still works
    let response = client
        .post(format!("{base}/api/v1/books/{book}/pages"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_reorder_validation() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let book = create_book(&client, &base, "Strict").await;
    let a = create_page(&client, &base, &book, 1).await;
    let b = create_page(&client, &base, &book, 2).await;
    let c = create_page(&client, &base, &book, 3).await;

    let reorder = |body: Value| {
        let client = client.clone();
        let url = format!("{base}/api/v1/pages/reorder");
        async move { client.post(url).json(&body).send().await.unwrap().status() }
    };

    // Malformed parent
    assert_eq!(
        reorder(json!({ "parentId": "nope", "pageOrder": [] })).await,
        StatusCode::BAD_REQUEST
    );
    // Missing parent
    assert_eq!(reorder(json!({ "pageOrder": [] })).await, StatusCode::BAD_REQUEST);
    // pageOrder not a list
    assert_eq!(
        reorder(json!({ "parentId": book, "pageOrder": { "pageId": a } })).await,
        StatusCode::BAD_REQUEST
    );
    // Duplicate target
    assert_eq!(
        reorder(json!({ "parentId": book, "pageOrder": [
            { "pageId": a, "newPosition": 5 },
            { "pageId": b, "newPosition": 5 },
        ]}))
        .await,
        StatusCode::BAD_REQUEST
    );
    // Unknown parent
    assert_eq!(
        reorder(json!({ "parentId": "65a1f0c2e4b0a1b2c3d4e5f6", "pageOrder": [] })).await,
        StatusCode::NOT_FOUND
    );
    // Collides with a page outside the request
    assert_eq!(
        reorder(json!({ "parentId": book, "pageOrder": [
            { "pageId": a, "newPosition": 3 },
        ]}))
        .await,
        StatusCode::CONFLICT
    );

    // None of the above changed anything
    let listed: Value = client
        .get(format!("{base}/api/v1/books/{book}/pages"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ids_and_positions(&listed), vec![(a, 1), (b, 2), (c, 3)]);
}

#[tokio::test]
async fn test_list_pages_for_malformed_book_is_empty() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/api/v1/books/not-an-id/pages"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let pages: Value = response.json().await.unwrap();
    assert_eq!(pages, json!([]));
}

#[tokio::test]
async fn test_page_lifecycle_with_web_view() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let book = create_book(&client, &base, "Playtime").await;

    let web_view: Value = client
        .post(format!("{base}/api/v1/webviews"))
        .json(&json!({
            "name": "Color the Fox",
            "url": "https://games.example/fox",
            "cover": "https://games.example/fox.png",
            "type": "coloring",
            "description": "Full record only"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let web_view_id = web_view["id"].as_str().unwrap();

    // Appended without a position
    let page: Value = client
        .post(format!("{base}/api/v1/books/{book}/pages"))
        .json(&json!({
            "text": "Color me in",
            "webViewId": web_view_id,
            "extra": { "isColoringPage": true }
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let page_id = page["id"].as_str().unwrap();

    assert_eq!(page["position"], 1);
    assert_eq!(page["parentId"], json!(book));
    assert_eq!(
        page["webView"],
        json!({
            "id": web_view_id,
            "url": "https://games.example/fox",
            "name": "Color the Fox",
            "cover": "https://games.example/fox.png",
            "type": "coloring"
        })
    );

    // Duplicate position rejected
    let response = client
        .post(format!("{base}/api/v1/books/{book}/pages"))
        .json(&json!({ "position": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Content edit
    let updated: Value = client
        .patch(format!("{base}/api/v1/pages/{page_id}"))
        .json(&json!({ "text": "Colored in", "webViewId": null }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["text"], "Colored in");
    assert_eq!(updated["webView"], Value::Null);
    assert_eq!(updated["extra"]["isColoringPage"], true);

    // Delete
    let response = client
        .delete(format!("{base}/api/v1/pages/{page_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{base}/api/v1/pages/{page_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{base}/api/v1/pages/xyz"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_and_repair() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let book = create_book(&client, &base, "Healthy").await;
    create_page(&client, &base, &book, 1).await;

    let status: Value = client
        .get(format!("{base}/api/v1/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "ok");
    assert_eq!(status["books"], 1);
    assert_eq!(status["pages"], 1);
    assert_eq!(status["placeholder_pages"], 0);

    let repaired: Value = client
        .post(format!("{base}/api/v1/books/{book}/pages/repair"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(repaired["repaired"], 0);
    assert_eq!(repaired["pages"].as_array().unwrap().len(), 1);

    // Deleting the book removes its pages
    let response = client
        .delete(format!("{base}/api/v1/books/{book}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .post(format!("{base}/api/v1/books/{book}/pages/repair"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
