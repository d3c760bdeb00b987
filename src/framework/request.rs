//! Per-request data handed to views: path, query parameters, form fields and front-hook extras.

use crate::error::AppError;
use axum::http::Method;
use std::collections::HashMap;

pub type Params = HashMap<String, String>;

/// Decode `application/x-www-form-urlencoded` input (`+` is a space, `%XX` are UTF-8 bytes).
/// A key given twice keeps its last value.
pub fn parse_input_data(data: &str) -> Result<Params, AppError> {
    if data.is_empty() {
        return Ok(Params::new());
    }
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(data).map_err(|e| AppError::BadRequest(format!("malformed form data: {}", e)))?;
    Ok(pairs.into_iter().collect())
}

/// Append the closing slash routes are registered with.
pub fn normalize_path(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Query string parameters.
    pub params: Params,
    /// Form fields of a POST body.
    pub data: Params,
    /// Values added by front hooks.
    pub extras: HashMap<String, String>,
}

impl Request {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    pub fn param_i64(&self, key: &str) -> Result<i64, AppError> {
        parse_i64(key, self.param(key))
    }

    pub fn field_i64(&self, key: &str) -> Result<i64, AppError> {
        parse_i64(key, self.field(key))
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }
}

fn parse_i64(key: &str, raw: Option<&str>) -> Result<i64, AppError> {
    let raw = raw.ok_or_else(|| AppError::BadRequest(format!("missing '{}'", key)))?;
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("'{}' must be an integer", key)))
}
