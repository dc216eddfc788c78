//! The relay handler: one inbound request in, one upstream exchange out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode, Version};
use axum::response::{IntoResponse, Response};

use crate::observability::metrics;
use crate::relay::transport::ForwardingClient;
use crate::relay::upstream::UpstreamTarget;

/// Shared state for every relay task. The client and upstream target are
/// read-shared for the process lifetime.
pub struct RelayState {
    pub client: ForwardingClient,
    pub upstream: UpstreamTarget,
    pub request_timeout: Duration,
}

/// Forward one inbound request to the upstream and stream the response back.
///
/// Failures are contained here: logged once with the target host, converted
/// to a fixed gateway-error response, and never retried. The response body
/// is handed back as a stream, so long-lived upstream responses reach the
/// client as they arrive.
pub async fn relay(State(state): State<Arc<RelayState>>, request: Request) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let (mut parts, body) = request.into_parts();

    let rewritten = match state.upstream.rewrite_uri(&parts.uri) {
        Ok(uri) => uri,
        Err(err) => {
            tracing::error!(uri = %parts.uri, error = %err, "failed to rewrite request target");
            return relay_failure(&method, started);
        }
    };

    strip_hop_by_hop(&mut parts.headers);
    parts.headers.insert(header::HOST, state.upstream.host_header());
    parts.uri = rewritten;
    // The client picks the wire version per pooled connection; the inbound
    // version must not leak through.
    parts.version = Version::HTTP_11;
    let outbound = Request::from_parts(parts, body);

    match tokio::time::timeout(state.request_timeout, state.client.request(outbound)).await {
        Ok(Ok(response)) => {
            let status = response.status();
            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            metrics::record_relay(method.as_str(), status.as_u16(), started);
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(err)) => {
            tracing::error!(
                upstream = %state.upstream.authority(),
                method = %method,
                error = %err,
                "relay to upstream failed"
            );
            relay_failure(&method, started)
        }
        Err(_) => {
            tracing::error!(
                upstream = %state.upstream.authority(),
                method = %method,
                timeout = ?state.request_timeout,
                "relay to upstream timed out"
            );
            relay_failure(&method, started)
        }
    }
}

/// The fixed response clients see on any relay failure, recorded as a 502
/// regardless of which step failed. Upstream error detail stays in the logs.
fn relay_failure(method: &Method, started: Instant) -> Response {
    metrics::record_relay(method.as_str(), StatusCode::BAD_GATEWAY.as_u16(), started);
    (StatusCode::BAD_GATEWAY, "upstream unavailable\n").into_response()
}

const HOP_BY_HOP_HEADERS: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named by `Connection`.
/// These describe the connection they arrived on, not the exchange.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| name.trim().parse::<HeaderName>().ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
