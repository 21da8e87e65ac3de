use crate::collectors::registry::CollectorRegistry;
use anyhow::Result;
use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use tracing::{debug, error};

/// Run one collection cycle and render it, followed by the scrape metrics.
async fn render(registry: &CollectorRegistry) -> Result<String> {
    let snapshot = registry.collect().await?;

    let mut body = snapshot.to_string();
    body.push_str(&registry.scraper().encode()?);

    Ok(body)
}

pub async fn metrics(Extension(registry): Extension<CollectorRegistry>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        "content-type",
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );

    match render(&registry).await {
        Ok(body) => {
            debug!("Successfully collected metrics");
            (StatusCode::OK, headers, body)
        }
        Err(e) => {
            error!("Failed to collect metrics: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                headers,
                format!("Error collecting metrics: {e:#}"),
            )
        }
    }
}
