//! HTTP handlers: HTML pages for the front controller and the JSON table API.

pub mod pages;
pub mod tables;
pub use pages::default_routes;
