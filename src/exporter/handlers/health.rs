use crate::collectors::registry::CollectorRegistry;
use crate::exporter::GIT_COMMIT_HASH;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    /// Configured trackers
    trackers: Vec<String>,
}

impl Health {
    fn new(registry: &CollectorRegistry) -> Self {
        Self {
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trackers: registry
                .sources()
                .configured()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    // name:version:short-hash
    fn app_headers(&self) -> HeaderMap {
        let short_hash = self.commit.get(..7).unwrap_or_default();
        let header_value = format!("{}:{}:{}", self.name, self.version, short_hash);

        let mut headers = HeaderMap::new();
        match header_value.parse::<HeaderValue>() {
            Ok(value) => {
                headers.insert("X-App", value);
            }
            Err(err) => {
                debug!("Failed to parse X-App header: {}", err);
            }
        }
        headers
    }
}

/// Tracker reachability is not probed; a scrape reports upstream failures.
pub async fn health(
    method: Method,
    Extension(registry): Extension<CollectorRegistry>,
) -> impl IntoResponse {
    let health = Health::new(&registry);
    let headers = health.app_headers();

    let body = if method == Method::GET {
        Json(&health).into_response().into_body()
    } else {
        Body::empty()
    };

    (StatusCode::OK, headers, body)
}
