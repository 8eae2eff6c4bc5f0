//! Forwarding error taxonomy.

use std::time::Duration;

use thiserror::Error;

/// Everything that can terminate one forwarding attempt.
///
/// A failed stage records exactly one of these on the request's trace;
/// there are no retries, and every variant is surfaced to the client the
/// same way (500 with the error text as body). `RouteNotFound` is the
/// exception: the frontend answers 404 before any forwarding starts.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("no transit rule for host: {0}")]
    RouteNotFound(String),

    #[error("no connection pool for host: {0}")]
    PoolNotFound(String),

    #[error("failed to build backend URL: {0}")]
    UrlConstruction(String),

    #[error("failed to read request body: {0}")]
    RequestBodyRead(#[source] axum::Error),

    #[error("failed to build backend request: {0}")]
    RequestBuild(#[source] axum::http::Error),

    #[error("backend request failed: {0}")]
    Dispatch(#[source] hyper_util::client::legacy::Error),

    #[error("backend request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    ResponseBodyRead(#[source] axum::Error),
}
