//! Outbound header construction.
//!
//! The three stages run in a fixed order that decides precedence:
//! forwarded client headers win over `extra`, and `set` wins over
//! everything. Reordering the stages changes observable semantics.

use axum::http::{header, HeaderMap};

use crate::routing::HeaderPolicy;

/// Build the header set sent to the backend from the inbound headers and
/// the rule's policy.
///
/// 1. When `forward_client` is on, every inbound header whose lowercased
///    name is not in `remove` is copied, multi-values preserved.
/// 2. `extra` entries are set only when the name has no value yet.
/// 3. `set` entries replace any existing values with the single value.
pub fn build_transit_headers(inbound: &HeaderMap, policy: &HeaderPolicy) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if policy.forward_client {
        for (name, value) in inbound.iter() {
            // The inbound Host names the frontend; the backend's host
            // comes from the target URL unless the policy sets one.
            if name == header::HOST || policy.remove.contains(name.as_str()) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
    }

    for (name, value) in &policy.extra {
        if !headers.contains_key(name) {
            headers.insert(name.clone(), value.clone());
        }
    }

    for (name, value) in &policy.set {
        // HeaderMap::insert drops all previous values for the name.
        headers.insert(name.clone(), value.clone());
    }

    headers
}
