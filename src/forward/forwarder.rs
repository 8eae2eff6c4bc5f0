//! One proxied round trip.
//!
//! The forwarding sequence is strictly ordered and terminal on first
//! failure: URL build, full body read, header transformation, pool
//! lookup, dispatch under the request timeout, full response read,
//! relay. Whatever happens is recorded on the request's trace; the
//! caller decides how to surface it.

use std::time::Duration;

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{header, Request, Response, Uri};
use hyper::body::Incoming;

use crate::forward::error::ForwardError;
use crate::forward::headers::build_transit_headers;
use crate::forward::pool::PoolRegistry;
use crate::forward::url::build_backend_url;
use crate::routing::TransitRule;
use crate::trace::Trace;

/// Forward one request to its backend.
///
/// Returns the completed trace and, on success, the response to relay
/// to the client. On failure the trace carries the terminal error and
/// no response is produced. The inbound body is read fully into memory
/// before dispatch; nothing is streamed.
pub async fn forward_request(
    registry: &PoolRegistry,
    host: &str,
    rule: &TransitRule,
    request: Request<Body>,
    request_timeout: Duration,
) -> (Trace, Option<Response<Body>>) {
    let (parts, body) = request.into_parts();
    let mut trace = Trace::begin(
        parts.method.clone(),
        host,
        parts.uri.path(),
        parts.headers.clone(),
    );

    let backend_url = match build_backend_url(rule, parts.uri.path(), parts.uri.query()) {
        Ok(url) => url,
        Err(e) => {
            trace.fail(e);
            return (trace, None);
        }
    };
    trace.backend_url = backend_url.clone();

    let backend_uri: Uri = match backend_url.parse() {
        Ok(uri) => uri,
        Err(e) => {
            trace.fail(ForwardError::UrlConstruction(e.to_string()));
            return (trace, None);
        }
    };

    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            trace.fail(ForwardError::RequestBodyRead(e));
            return (trace, None);
        }
    };
    trace.request_body = body_bytes.clone();

    let mut transit_headers = build_transit_headers(&parts.headers, &rule.headers);
    trace.transit_headers = transit_headers.clone();

    let Some(client) = registry.get(host) else {
        trace.fail(ForwardError::PoolNotFound(host.to_string()));
        return (trace, None);
    };

    // Unless the policy set one, the outbound Host is the backend's.
    if !transit_headers.contains_key(header::HOST) {
        if let Some(authority) = backend_uri.authority() {
            if let Ok(value) = HeaderValue::from_str(authority.as_str()) {
                transit_headers.insert(header::HOST, value);
            }
        }
    }

    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(backend_uri);
    if let Some(headers) = builder.headers_mut() {
        *headers = transit_headers;
    }
    let outbound = match builder.body(Body::from(body_bytes)) {
        Ok(request) => request,
        Err(e) => {
            trace.fail(ForwardError::RequestBuild(e));
            return (trace, None);
        }
    };

    let response: Response<Incoming> =
        match tokio::time::timeout(request_timeout, client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                trace.fail(ForwardError::Dispatch(e));
                return (trace, None);
            }
            Err(_) => {
                trace.fail(ForwardError::Timeout(request_timeout));
                return (trace, None);
            }
        };

    let (resp_parts, resp_body) = response.into_parts();
    trace.status = Some(resp_parts.status);
    trace.response_headers = resp_parts.headers.clone();

    let resp_bytes = match axum::body::to_bytes(Body::new(resp_body), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            trace.fail(ForwardError::ResponseBodyRead(e));
            return (trace, None);
        }
    };
    trace.response_body = resp_bytes.clone();

    // Relay the backend's status, headers and body verbatim.
    let mut relay = Response::new(Body::from(resp_bytes));
    *relay.status_mut() = resp_parts.status;
    *relay.headers_mut() = resp_parts.headers;

    (trace, Some(relay))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProxyConfig, TimeoutConfig, TransitRuleConfig};
    use crate::routing::RouteTable;

    fn rule(base: &str) -> TransitRule {
        TransitRule::compile(
            "a.example.com",
            &TransitRuleConfig {
                backend_base: base.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn empty_registry() -> PoolRegistry {
        let table = RouteTable::from_config(&ProxyConfig::default()).unwrap();
        PoolRegistry::from_routes(&table, &TimeoutConfig::default())
    }

    #[tokio::test]
    async fn missing_pool_is_a_forwarding_failure() {
        let registry = empty_registry();
        let request = Request::builder()
            .uri("http://a.example.com/users")
            .body(Body::empty())
            .unwrap();

        let (trace, response) = forward_request(
            &registry,
            "a.example.com",
            &rule("backend:9000"),
            request,
            Duration::from_secs(5),
        )
        .await;

        assert!(response.is_none());
        let error = trace.error.unwrap();
        assert!(matches!(error, ForwardError::PoolNotFound(_)));
        // URL build already happened, so the trace carries the target.
        assert_eq!(trace.backend_url, "http://backend:9000/users");
    }

    #[tokio::test]
    async fn url_failure_terminates_before_body_read() {
        let registry = empty_registry();
        let request = Request::builder()
            .uri("http://a.example.com/users")
            .body(Body::from("payload"))
            .unwrap();

        let broken = TransitRule {
            backend_base: String::new(),
            ..rule("backend:9000")
        };
        let (trace, response) = forward_request(
            &registry,
            "a.example.com",
            &broken,
            request,
            Duration::from_secs(5),
        )
        .await;

        assert!(response.is_none());
        assert!(matches!(
            trace.error,
            Some(ForwardError::UrlConstruction(_))
        ));
        assert!(trace.request_body.is_empty());
    }
}
