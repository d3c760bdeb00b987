//! End-to-end requests through the full router on an in-memory database.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use campus::{app, AppState, Settings};
use serde_json::Value;
use tower::ServiceExt;

async fn state_with(mode: Option<&str>) -> AppState {
    let settings = Settings::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_string()),
        "APP_MODE" => mode.map(str::to_string),
        _ => None,
    })
    .unwrap();
    AppState::bootstrap(&settings).await.unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_form(router: &Router, uri: &str, form: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    send(router, request).await
}

#[tokio::test]
async fn index_and_static_pages_render_inside_the_layout() {
    let router = app(state_with(None).await);
    for (uri, title) in [("/", "Home"), ("/about", "About"), ("/index/", "Home")] {
        let (status, body) = get(&router, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(body.contains(&format!("<title>{}</title>", title)), "{}", uri);
    }
}

#[tokio::test]
async fn unknown_paths_fall_through_to_page_not_found() {
    let router = app(state_with(None).await);
    let (status, body) = get(&router, "/no-such-page/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "404 PAGE Not Found");
}

#[tokio::test]
async fn contact_page_shows_the_date_from_the_front_hook() {
    let router = app(state_with(None).await);
    let (status, body) = get(&router, "/contact/").await;
    assert_eq!(status, StatusCode::OK);
    let today = chrono::Local::now().date_naive().to_string();
    assert!(body.contains(&today));
}

#[tokio::test]
async fn seeded_categories_and_students_are_listed() {
    let router = app(state_with(None).await);
    let (status, body) = get(&router, "/category-list/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Interactive courses"));
    assert!(body.contains("Web category"));

    let (_, body) = get(&router, "/student-list/").await;
    assert!(body.contains("Ivan Ivanov"));
    assert!(body.contains("Petr Sidorov"));

    let (_, body) = get(&router, "/course-list/?id=1").await;
    assert!(body.contains("Programming in Rust"));
    assert!(!body.contains("WEB for everyone"));
}

#[tokio::test]
async fn creating_a_student_persists_and_lists_it() {
    let state = state_with(None).await;
    let router = app(state.clone());
    let (status, body) = post_form(&router, "/student-create/", "name=Anna+Petrova").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Anna Petrova"));

    let n = state
        .registry
        .get_mapper("student")
        .unwrap()
        .count(&state.pool, &[])
        .await
        .unwrap();
    assert_eq!(n, 3);
}

#[tokio::test]
async fn blank_student_name_is_rejected() {
    let router = app(state_with(None).await);
    let (status, _) = post_form(&router, "/student-create/", "name=+++").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn enrolment_shows_on_the_student_page_and_repeats_conflict() {
    let router = app(state_with(None).await);
    let (status, body) = post_form(&router, "/course-add-student/", "course_id=2&student_id=1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Programming in Rust"));

    let (status, _) = post_form(&router, "/course-add-student/", "course_id=2&student_id=1").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = get(&router, "/course-add-student/").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (_, body) = get(&router, "/course-select/?student_id=1").await;
    assert!(!body.contains("Programming in Rust"));
    assert!(body.contains("Programming outlook"));
}

#[tokio::test]
async fn copying_a_course_adds_a_prefixed_course_to_the_same_category() {
    let router = app(state_with(None).await);
    let (status, body) = get(&router, "/course-copy/?name=Programming+in+Rust").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("copy_Programming in Rust"));

    let (status, _) = get(&router, "/course-copy/?name=Nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn course_list_requires_a_numeric_id() {
    let router = app(state_with(None).await);
    let (status, _) = get(&router, "/course-list/?id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&router, "/course-list/?id=99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fake_mode_answers_every_path_the_same() {
    let router = app(state_with(Some("fake")).await);
    for uri in ["/", "/student-list/", "/whatever", "/health", "/ready", "/api/v1/tables/student"] {
        let (status, body) = get(&router, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Hello from Fake");
    }
}

#[tokio::test]
async fn health_and_ready_report_ok() {
    let router = app(state_with(None).await);
    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["status"], "ok");

    let (status, body) = get(&router, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["tables"]["student"], 2);
    assert_eq!(json["tables"]["course"], 4);

    let (_, body) = get(&router, "/version").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["mode"], "normal");
    assert_eq!(json["tables"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn table_api_lists_filters_and_reads_rows() {
    let router = app(state_with(None).await);
    let (status, body) = get(&router, "/api/v1/tables/course?kind=interactive").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["meta"]["count"], 2);
    assert_eq!(json["meta"]["table"], "course");
    assert_eq!(json["data"][0]["name"], "Programming outlook");

    let (status, body) = get(&router, "/api/v1/tables/student/2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"]["name"], "Petr Sidorov");

    let (status, _) = get(&router, "/api/v1/tables/student/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get(&router, "/api/v1/tables/teacher").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fake_mode_still_answers_posts_without_touching_the_database() {
    let state = state_with(Some("fake")).await;
    let router = app(state.clone());
    let (status, body) = post_form(&router, "/student-create/", "name=Nobody").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello from Fake");
    let n = state
        .registry
        .get_mapper("student")
        .unwrap()
        .count(&state.pool, &[])
        .await
        .unwrap();
    assert_eq!(n, 2);
}

#[tokio::test]
async fn debug_mode_serves_pages_and_json_as_usual() {
    let router = app(state_with(Some("debug")).await);
    let (status, body) = get(&router, "/student-list/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ivan Ivanov"));

    let (status, body) = get(&router, "/api/v1/tables/category/1").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["data"]["name"], "Interactive courses");

    let (status, body) = get(&router, "/missing/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "404 PAGE Not Found");
}

#[tokio::test]
async fn a_student_named_null_is_found_by_name() {
    let router = app(state_with(None).await);
    let (status, _) = post_form(&router, "/student-create/", "name=null").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = get(&router, "/api/v1/tables/student?name=null").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["meta"]["count"], 1);
    assert_eq!(json["data"][0]["name"], "null");

    let (_, body) = get(&router, "/api/v1/tables/category?category_id=null").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["meta"]["count"], 2);
}
