//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "blaze_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "blaze_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "blaze_http_requests_in_flight";

    // Pairing metrics
    pub const PAIRINGS_PENDING: &str = "blaze_pairings_pending";
    pub const EXPIRY_NOTIFICATIONS_TOTAL: &str = "blaze_expiry_notifications_total";

    // Thumbnail metrics
    pub const THUMBNAIL_BYTES: &str = "blaze_thumbnail_bytes";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Update pending pairings gauge.
pub fn set_pending_pairings(count: usize) {
    gauge!(names::PAIRINGS_PENDING).set(count as f64);
}

/// Record an expiry notification handled by the listener.
pub fn record_expiry_notification() {
    counter!(names::EXPIRY_NOTIFICATIONS_TOTAL).increment(1);
}

/// Record the size of a delivered thumbnail.
pub fn record_thumbnail_size(size_bytes: u64, passthrough: bool) {
    let labels = [("passthrough", passthrough.to_string())];
    histogram!(names::THUMBNAIL_BYTES, &labels).record(size_bytes as f64);
}

fn chat_id_pattern() -> &'static regex_lite::Regex {
    static PATTERN: OnceLock<regex_lite::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex_lite::Regex::new(r"/chats/-?[0-9]+(/|$)").expect("static chat id pattern")
    })
}

/// Sanitize path for metrics labels (replace chat IDs).
fn sanitize_path(path: &str) -> String {
    chat_id_pattern()
        .replace_all(path, "/chats/:chat_id$1")
        .to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
