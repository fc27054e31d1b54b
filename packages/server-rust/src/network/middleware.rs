//! HTTP middleware for the calculator server.
//!
//! Two pieces:
//! - [`build_http_layers`]: the transport-level Tower stack applied to every
//!   route. Ordering follows the outer-to-inner convention: the first layer
//!   listed is the outermost.
//! - [`track_requests`]: the request logger for API routes. It numbers each
//!   request, logs it on the `calc::request` target, refuses new work while
//!   draining and holds an in-flight guard until the response is produced.

use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, info_span, Instrument};

use super::config::NetworkConfig;
use super::handlers::{AppState, ErrorBody};
use crate::telemetry::REQUEST_TARGET;

// ---------------------------------------------------------------------------
// Transport layers
// ---------------------------------------------------------------------------

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        TimeoutLayer,
        tower::layer::util::Stack<
            CorsLayer,
            tower::layer::util::Stack<
                CompressionLayer,
                tower::layer::util::Stack<
                    TraceLayer<
                        tower_http::classify::SharedClassifier<
                            tower_http::classify::ServerErrorsAsFailures,
                        >,
                    >,
                    tower::layer::util::Stack<
                        SetRequestIdLayer<MakeRequestUuid>,
                        tower::layer::util::Identity,
                    >,
                >,
            >,
        >,
    >,
>;

/// Builds the HTTP-level Tower middleware stack from the network configuration.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `X-Request-Id` to every incoming request
/// 2. `Tracing` -- request/response trace spans
/// 3. `Compression` -- gzip response compression
/// 4. `CORS` -- Cross-Origin Resource Sharing based on configured origins
/// 5. `Timeout` -- 408 once `request_timeout` elapses
/// 6. `PropagateRequestId` -- copies `X-Request-Id` from the request to the response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static("x-request-id");

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// Builds the CORS layer from the configured list of allowed origins.
///
/// A wildcard `"*"` allows any origin; otherwise each entry that parses as
/// a header value is allow-listed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

// ---------------------------------------------------------------------------
// Request logger
// ---------------------------------------------------------------------------

/// Sequence number of a request, inserted into request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestNumber(pub u64);

/// Numbers, logs and tracks each API request.
pub async fn track_requests(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if !state.shutdown.health_state().accepts_requests() {
        return ErrorBody::new("Error: server is shutting down")
            .with_status(StatusCode::SERVICE_UNAVAILABLE);
    }
    let _guard = state.shutdown.in_flight_guard();

    let number = state.request_counter.fetch_add(1, Ordering::Relaxed);
    let resource = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), ToString::to_string);
    info!(
        target: REQUEST_TARGET,
        "Incoming request | #{number} | resource: {resource} | HTTP Verb {}",
        request.method()
    );
    request.extensions_mut().insert(RequestNumber(number));

    let start = Instant::now();
    let response = next
        .run(request)
        .instrument(info_span!(target: REQUEST_TARGET, "request", number))
        .await;
    debug!(
        target: REQUEST_TARGET,
        "request #{number} duration: {}ms",
        start.elapsed().as_millis()
    );
    response
}
