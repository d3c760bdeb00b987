use super::{Page, Request, View};
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use std::time::Instant;

/// Wraps a view and logs how long each call took.
pub struct Timed<V> {
    label: &'static str,
    inner: V,
}

impl<V: View> Timed<V> {
    pub fn new(label: &'static str, inner: V) -> Self {
        Timed { label, inner }
    }
}

#[async_trait]
impl<V: View> View for Timed<V> {
    async fn call(&self, state: &AppState, request: &Request) -> Result<Page, AppError> {
        let started = Instant::now();
        let result = self.inner.call(state, request).await;
        let elapsed = started.elapsed();
        tracing::debug!(
            view = self.label,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            ok = result.is_ok(),
            "view timed"
        );
        result
    }
}
