//! Front controller: normalise the path, parse parameters, run front hooks, dispatch to a view.

pub mod debug;
pub mod request;
pub mod templates;

pub use debug::Timed;
pub use request::{normalize_path, parse_input_data, Params, Request};
pub use templates::{escape_html, Templates};

use crate::config::AppMode;
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Request as HttpRequest, State},
    http::{Method, StatusCode, Uri},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;

/// A rendered HTML page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub status: StatusCode,
    pub body: String,
}

impl Page {
    pub fn ok(body: impl Into<String>) -> Self {
        Page {
            status: StatusCode::OK,
            body: body.into(),
        }
    }

    pub fn with_status(status: StatusCode, body: impl Into<String>) -> Self {
        Page {
            status,
            body: body.into(),
        }
    }

    /// Plain error page carrying the error's status.
    pub fn from_error(err: &AppError) -> Self {
        let (status, _) = err.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %err, "view failed");
        }
        Page::with_status(
            status,
            format!("<h1>{}</h1><p>{}</p>", status, escape_html(&err.to_string())),
        )
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.status, Html(self.body)).into_response()
    }
}

/// A page controller.
#[async_trait]
pub trait View: Send + Sync {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError>;
}

/// Hook run on every request before its view.
pub type Front = fn(&mut Request);

/// Puts today's date into the request.
pub fn secret_front(request: &mut Request) {
    request
        .extras
        .insert("date".into(), chrono::Local::now().date_naive().to_string());
}

pub fn other_front(request: &mut Request) {
    request.extras.insert("key".into(), "key".into());
}

pub fn default_fronts() -> Vec<Front> {
    vec![secret_front, other_front]
}

pub struct PageNotFound;

#[async_trait]
impl View for PageNotFound {
    async fn call(&self, _state: &AppState, _request: &Request) -> Result<Page, AppError> {
        Ok(Page::with_status(StatusCode::NOT_FOUND, "404 PAGE Not Found"))
    }
}

/// Path (with trailing slash) to view.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Arc<dyn View>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, view: impl View + 'static) -> Self {
        self.routes.insert(normalize_path(path), Arc::new(view));
        self
    }

    pub fn resolve(&self, path: &str) -> Option<Arc<dyn View>> {
        self.routes.get(path).cloned()
    }

    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

pub struct FrontController {
    routes: RouteTable,
    fronts: Vec<Front>,
    mode: AppMode,
}

impl FrontController {
    pub fn new(routes: RouteTable, fronts: Vec<Front>, mode: AppMode) -> Self {
        FrontController { routes, fronts, mode }
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Build the request, run the fronts and call the view. Errors become error pages.
    pub async fn handle(&self, state: &AppState, method: Method, uri: &Uri, body: &[u8]) -> Page {
        let request = match self.build_request(method, uri, body) {
            Ok(r) => r,
            Err(e) => return Page::from_error(&e),
        };
        let view = self
            .routes
            .resolve(&request.path)
            .unwrap_or_else(|| Arc::new(PageNotFound) as Arc<dyn View>);
        match view.call(state, &request).await {
            Ok(page) => page,
            Err(e) => Page::from_error(&e),
        }
    }

    fn build_request(&self, method: Method, uri: &Uri, body: &[u8]) -> Result<Request, AppError> {
        let path = normalize_path(uri.path());
        let params = parse_input_data(uri.query().unwrap_or(""))?;
        let data = if method == Method::POST {
            let text = std::str::from_utf8(body)
                .map_err(|_| AppError::BadRequest("form data must be UTF-8".into()))?;
            parse_input_data(text)?
        } else {
            Params::new()
        };
        if method == Method::POST {
            tracing::debug!(path = %path, data = ?data, "POST request");
        } else {
            tracing::debug!(path = %path, params = ?params, "{} request", method);
        }

        let mut request = Request {
            method,
            path,
            params,
            data,
            extras: HashMap::new(),
        };
        for front in &self.fronts {
            front(&mut request);
        }
        Ok(request)
    }
}

/// Axum fallback handler: every path not claimed by another route goes through the front controller.
pub async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri, body: Bytes) -> Page {
    let front = state.front.clone();
    front.handle(&state, method, &uri, &body).await
}

/// Router-wide middleware for the application mode: `fake` answers everything itself,
/// `debug` logs each request before passing it on.
pub async fn app_mode(State(state): State<AppState>, request: HttpRequest, next: Next) -> Response {
    match state.front.mode() {
        AppMode::Fake => return Page::ok("Hello from Fake").into_response(),
        AppMode::Debug => {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                headers = ?request.headers(),
                "DEBUG MODE"
            );
        }
        AppMode::Normal => {}
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fronts_fill_extras() {
        let mut r = Request::default();
        for front in default_fronts() {
            front(&mut r);
        }
        assert_eq!(r.extra("key"), Some("key"));
        let date = r.extra("date").unwrap();
        assert!(chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
    }

    #[test]
    fn build_request_parses_query_and_form() {
        let fc = FrontController::new(RouteTable::new(), vec![other_front as Front], AppMode::Normal);
        let uri: Uri = "/course-create?id=3".parse().unwrap();
        let r = fc.build_request(Method::POST, &uri, b"name=Rust+basics&kind=record").unwrap();
        assert_eq!(r.path, "/course-create/");
        assert_eq!(r.param("id"), Some("3"));
        assert_eq!(r.field("name"), Some("Rust basics"));
        assert_eq!(r.extra("key"), Some("key"));

        let r = fc.build_request(Method::GET, &uri, b"name=ignored").unwrap();
        assert!(r.data.is_empty());
        assert!(fc.build_request(Method::POST, &uri, &[0xff, 0xfe]).is_err());
    }

    #[test]
    fn route_table_normalizes_paths() {
        let routes = RouteTable::new().route("/about", PageNotFound).route("/", PageNotFound);
        assert!(routes.resolve("/about/").is_some());
        assert!(routes.resolve("/about").is_none());
        assert_eq!(routes.paths(), ["/", "/about/"]);
    }

    #[test]
    fn error_pages_carry_status_and_escape() {
        let page = Page::from_error(&AppError::NotFound("<course>".into()));
        assert_eq!(page.status, StatusCode::NOT_FOUND);
        assert!(page.body.contains("&lt;course&gt;"));
    }
}
