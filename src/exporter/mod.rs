use crate::{
    cli::telemetry::shutdown_tracer,
    collectors::{config::CollectorConfig, registry::CollectorRegistry},
    tracker::{Sources, TrackerSettings},
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::{Next, from_fn},
    response::Response,
    routing::get,
};
use opentelemetry::global;
use opentelemetry::trace::{TraceContextExt, TraceId};
use opentelemetry_http::HeaderExtractor;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use ulid::Ulid;

mod handlers;
mod shutdown;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = if let Some(hash) = built_info::GIT_COMMIT_HASH {
    hash
} else {
    ":-("
};

/// Build the HTTP application serving `/metrics` and `/health`.
pub fn router(registry: CollectorRegistry) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(make_span)
        .on_response(on_response);

    Router::new()
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(trace_layer)
                .layer(from_fn(add_trace_headers))
                .layer(Extension(registry)),
        )
}

/// Bind `listen:port`, or `[::]:port` falling back to `0.0.0.0:port`.
///
/// # Errors
///
/// Returns an error if `listen` is not an IP address or binding fails
pub async fn bind(port: u16, listen: Option<&str>) -> Result<(TcpListener, String)> {
    if let Some(addr) = listen {
        let ip = addr.parse::<IpAddr>().map_err(|_| {
            anyhow!(
                "Invalid IP address: '{addr}'. Expected IPv4 (e.g., 0.0.0.0, 127.0.0.1) or IPv6 (e.g., ::, ::1)"
            )
        })?;

        let bind_addr = format!("{ip}:{port}");
        let listener = TcpListener::bind((ip, port))
            .await
            .with_context(|| format!("Failed to bind to {bind_addr}"))?;

        let display = if ip.is_ipv6() {
            format!("[{ip}]:{port}")
        } else {
            bind_addr
        };

        return Ok((listener, display));
    }

    // Auto: try IPv6 first, fallback to IPv4
    match TcpListener::bind(format!("[::]:{port}")).await {
        Ok(listener) => Ok((listener, format!("[::]:{port}"))),
        Err(_) => {
            let listener = TcpListener::bind(format!("0.0.0.0:{port}"))
                .await
                .with_context(|| format!("Failed to bind to 0.0.0.0:{port}"))?;
            Ok((listener, format!("0.0.0.0:{port}")))
        }
    }
}

/// Start the exporter and serve until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the tracker clients cannot be built, no collector can
/// run, or the listener cannot be bound
pub async fn new(
    port: u16,
    listen: Option<String>,
    trackers: TrackerSettings,
    config: CollectorConfig,
) -> Result<()> {
    let sources = Sources::connect(&trackers)?;
    let registry = CollectorRegistry::new(config, sources)?;

    let collectors = registry.collector_names();
    let configured = registry.sources().configured();

    let app = router(registry);

    let (listener, bind_addr) = bind(port, listen.as_deref()).await?;

    println!(
        "{} {} - Listening on {bind_addr}\n\nTrackers:\n{}\n\nEnabled collectors:\n{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        format_list(&configured),
        format_list(&collectors),
    );

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
    {
        error!(error=%e, "server error");
    }

    info!("shutting down");

    shutdown_tracer();

    Ok(())
}

// Helper to format a list of items with a leading dash and indentation for the
// start up message
fn format_list<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn header<'a>(request: &'a Request<Body>, name: &str, default: &'a str) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(default)
}

fn make_span(request: &Request<Body>) -> Span {
    let parent_cx =
        global::get_text_map_propagator(|prop| prop.extract(&HeaderExtractor(request.headers())));

    let span = info_span!(
        "http.server.request",
        otel.kind = "server",
        otel.status_code = tracing::field::Empty,
        http.method = request.method().as_str(),
        http.route = request.uri().path(),
        http.target = %request.uri(),
        http.scheme = request.uri().scheme_str().unwrap_or("http"),
        http.user_agent = header(request, "user-agent", "unknown"),
        request_id = header(request, "x-request-id", "none"),
    );

    let _ = span.set_parent(parent_cx);

    span
}

fn on_response<B>(response: &axum::http::Response<B>, latency: Duration, span: &Span) {
    let status = response.status();

    span.record(
        "otel.status_code",
        if status.is_server_error() { "ERROR" } else { "OK" },
    );

    let elapsed_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    let trace_id = span.context().span().span_context().trace_id();

    if trace_id == TraceId::INVALID {
        info!(parent: span, status = status.as_u16(), elapsed_ms, "request completed");
    } else {
        info!(
            parent: span,
            status = status.as_u16(),
            elapsed_ms,
            trace_id = %trace_id,
            "request completed"
        );
    }
}

async fn add_trace_headers(req: Request<Body>, next: Next) -> Response {
    let mut res = next.run(req).await;

    let cx = Span::current().context();
    let span_context = cx.span().span_context().clone();

    if span_context.is_valid()
        && let Ok(val) = HeaderValue::from_str(&span_context.trace_id().to_string())
    {
        res.headers_mut()
            .insert(HeaderName::from_static("x-trace-id"), val);
    }

    res
}
