use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use todo_core::{Todo, TodoStore};
use todo_kv::{KvEngine, MemoryEngine};
use todo_server::{app, stats::StatsSnapshot};
use tower::ServiceExt;

fn test_app() -> Router {
    app(TodoStore::new(MemoryEngine::new()))
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_text(response: axum::response::Response) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn post(uri: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn assert_redirects_home(resp: &axum::response::Response) {
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[http::header::LOCATION], "/");
}

async fn list(app: &Router) -> Vec<Todo> {
    let resp = app.clone().oneshot(get("/todos")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

async fn add(app: &Router, title: &str) {
    let body = format!("title={title}");
    let resp = app.clone().oneshot(form_request("/add", &body)).await.unwrap();
    assert_redirects_home(&resp);
}

// --- list ---

#[tokio::test]
async fn list_todos_empty() {
    let app = test_app();
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn index_renders_empty_page() {
    let app = test_app();
    let resp = app.oneshot(get("/")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()[http::header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    assert!(body_text(resp).await.contains("Nothing to do"));
}

// --- add ---

#[tokio::test]
async fn add_redirects_and_assigns_ids() {
    let app = test_app();
    add(&app, "buy+milk").await;
    add(&app, "walk+dog").await;

    let todos = list(&app).await;
    assert_eq!(
        todos,
        vec![
            Todo { id: 0, title: "buy milk".into(), done: false },
            Todo { id: 1, title: "walk dog".into(), done: false },
        ]
    );
}

#[tokio::test]
async fn add_without_form_content_type_is_rejected() {
    let app = test_app();
    let resp = app.clone().oneshot(post("/add")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn index_escapes_titles() {
    let app = test_app();
    add(&app, "%3Cscript%3Ealert(1)%3C%2Fscript%3E").await;

    let html = body_text(app.oneshot(get("/")).await.unwrap()).await;
    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

// --- done ---

#[tokio::test]
async fn done_toggles_both_ways() {
    let app = test_app();
    add(&app, "task").await;

    let resp = app.clone().oneshot(post("/done/0")).await.unwrap();
    assert_redirects_home(&resp);
    assert!(list(&app).await[0].done);

    let resp = app.clone().oneshot(get("/done/0")).await.unwrap();
    assert_redirects_home(&resp);
    assert!(!list(&app).await[0].done);
}

#[tokio::test]
async fn done_not_found() {
    let app = test_app();
    let resp = app.oneshot(post("/done/42")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn done_bad_id_returns_400() {
    let app = test_app();
    let resp = app.oneshot(post("/done/not-a-number")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- clear ---

#[tokio::test]
async fn clear_removes_and_ids_are_not_reused() {
    let app = test_app();
    add(&app, "first").await;
    add(&app, "second").await;

    let resp = app.clone().oneshot(get("/clear/0")).await.unwrap();
    assert_redirects_home(&resp);

    add(&app, "third").await;
    let ids: Vec<u64> = list(&app).await.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn clear_not_found() {
    let app = test_app();
    let resp = app.oneshot(post("/clear/7")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn corrupt_record_fails_listing_with_500() {
    let engine = std::sync::Arc::new(MemoryEngine::new());
    engine.put("todo_0", b"garbage").unwrap();
    let app = app(TodoStore::from_shared(engine));

    let resp = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(resp).await, "Internal Error");

    let resp = app.oneshot(get("/todos")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- debug ---

#[tokio::test]
async fn metrics_count_handler_calls() {
    let app = test_app();
    add(&app, "a").await;
    add(&app, "b").await;
    app.clone().oneshot(get("/done/0")).await.unwrap();
    app.clone().oneshot(get("/clear/1")).await.unwrap();
    app.clone().oneshot(get("/")).await.unwrap();

    let resp = app.oneshot(get("/debug/metrics")).await.unwrap();
    let metrics: serde_json::Value = body_json(resp).await;
    assert_eq!(
        metrics,
        serde_json::json!({"n_add": 2, "n_clear": 1, "n_done": 1, "n_index": 1})
    );
}

#[tokio::test]
async fn stats_count_responses_by_status() {
    let app = test_app();
    add(&app, "a").await;
    app.clone().oneshot(get("/done/99")).await.unwrap();
    app.clone().oneshot(get("/todos")).await.unwrap();

    let resp = app.oneshot(get("/debug/stats")).await.unwrap();
    let stats: StatsSnapshot = body_json(resp).await;
    assert_eq!(stats.total_count, 3);
    assert_eq!(stats.status_code_count.get("302"), Some(&1));
    assert_eq!(stats.status_code_count.get("404"), Some(&1));
    assert_eq!(stats.status_code_count.get("200"), Some(&1));
}

#[tokio::test]
async fn index_is_gzipped_when_accepted() {
    let app = test_app();
    let req = Request::builder()
        .uri("/")
        .header(http::header::ACCEPT_ENCODING, "gzip")
        .body(String::new())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_ENCODING], "gzip");
    let bytes = body_bytes(resp).await;
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = test_app();
    let resp = app.oneshot(get("/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
