use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::util::ServiceExt;

use folio::server::router;
use folio::{AppState, Bounded, FileStore, TemplateSet};

fn wiki(data_dir: &std::path::Path) -> Router {
    let store = Bounded::new(FileStore::new(data_dir), Duration::from_secs(2));
    let templates = TemplateSet::builtin("Folio").unwrap();
    router(AppState::new(Arc::new(store), templates, data_dir.join("public")))
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn save(title: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/save/{}", title))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

async fn text(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn write_read_and_count_articles() {
    let dir = tempfile::tempdir().unwrap();
    let app = wiki(dir.path());

    let resp = send(&app, get("/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("0 articles"));

    // A page nobody wrote yet sends the reader to the editor
    let resp = send(&app, get("/view/FrontPage")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[header::LOCATION], "/edit/FrontPage");

    let resp = send(&app, get("/edit/FrontPage")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("\"></textarea>"));

    let resp = send(&app, save("FrontPage", "body=%23+Welcome%0A%0AFirst+%2A%2Apage%2A%2A.")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[header::LOCATION], "/view/FrontPage");

    let html = text(send(&app, get("/view/FrontPage")).await).await;
    assert!(html.contains("<h1 id=\"welcome\">Welcome</h1>"));
    assert!(html.contains("<strong>page</strong>"));

    let html = text(send(&app, get("/edit/FrontPage")).await).await;
    assert!(html.contains("# Welcome\n\nFirst **page**.</textarea>"));

    let resp = send(&app, save("Second", "body=two")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(text(send(&app, get("/")).await).await.contains("2 articles"));

    // Overwrite keeps the count and replaces the body
    send(&app, save("Second", "body=2")).await;
    assert!(text(send(&app, get("/")).await).await.contains("2 articles"));
    assert_eq!(std::fs::read_to_string(dir.path().join("_second.md")).unwrap(), "2");
}

#[tokio::test]
async fn traversal_titles_are_not_found_and_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let app = wiki(dir.path());

    let resp = send(&app, save("..%2Fescape", "body=x")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = send(&app, get("/view/..%2Fescape")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(!dir.path().parent().unwrap().join("escape.md").exists());
}

#[tokio::test]
async fn missing_data_directory_is_an_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = wiki(&dir.path().join("gone"));

    let resp = send(&app, get("/")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(text(resp).await.starts_with("Storage unavailable"));

    let resp = send(&app, save("Page", "body=x")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = send(&app, get("/view/Page")).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
