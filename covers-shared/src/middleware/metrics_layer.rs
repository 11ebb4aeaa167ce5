//! Request counters and latency histograms, labelled by method, route
//! template and status code.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let method = req.method().as_str().to_owned();
    let route = route_label(
        matched_path.as_ref().map(|p| p.as_str()),
        req.uri().path(),
    );
    let started = Instant::now();

    let response = next.run(req).await;

    let labels = [
        ("method", method),
        ("path", route),
        ("status", response.status().as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());

    response
}

/// The route template (`/bookings/:id/history`) when the router matched,
/// the raw path otherwise.
fn route_label(matched: Option<&str>, raw: &str) -> String {
    matched.unwrap_or(raw).to_owned()
}

/// Install the global Prometheus recorder; the handle renders `/metrics`.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_routes_keep_their_template() {
        assert_eq!(
            route_label(Some("/bookings/:id/history"), "/bookings/42/history"),
            "/bookings/:id/history"
        );
    }

    #[test]
    fn unmatched_requests_fall_back_to_the_raw_path() {
        assert_eq!(route_label(None, "/no-such-route"), "/no-such-route");
    }
}
