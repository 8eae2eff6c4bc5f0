//! Backend URL construction.
//!
//! The backend receives the client's path verbatim modulo prefixing: no
//! normalization of `..` segments and no re-encoding happens here.

use crate::forward::error::ForwardError;
use crate::routing::TransitRule;

/// Build the absolute backend URL for one inbound request.
///
/// Trailing `/` is trimmed from the base, the rule's prefix is prepended
/// to the inbound path, a leading `/` is ensured, the raw query string is
/// appended unchanged, and `http://` is assumed when the base has no
/// scheme.
pub fn build_backend_url(
    rule: &TransitRule,
    path: &str,
    raw_query: Option<&str>,
) -> Result<String, ForwardError> {
    if rule.backend_base.is_empty() {
        return Err(ForwardError::UrlConstruction(
            "backend base URL is empty".to_string(),
        ));
    }

    let base = rule.backend_base.trim_end_matches('/');
    let mut path = format!("{}{}", rule.backend_prefix, path);

    if let Some(query) = raw_query {
        if !query.is_empty() {
            path.push('?');
            path.push_str(query);
        }
    }

    if !path.starts_with('/') {
        path.insert(0, '/');
    }

    if base.starts_with("http://") || base.starts_with("https://") {
        Ok(format!("{}{}", base, path))
    } else {
        Ok(format!("http://{}{}", base, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{HeaderPolicy, ResolveOverride};

    fn rule(base: &str, prefix: &str) -> TransitRule {
        TransitRule {
            backend_base: base.to_string(),
            backend_prefix: prefix.to_string(),
            resolve: ResolveOverride::System,
            headers: HeaderPolicy::default(),
        }
    }

    #[test]
    fn prefix_and_query_are_applied() {
        // route api.example.com -> http://backend:9000 with prefix /v1
        let url = build_backend_url(&rule("http://backend:9000", "/v1"), "/users", Some("x=1"));
        assert_eq!(url.unwrap(), "http://backend:9000/v1/users?x=1");
    }

    #[test]
    fn missing_scheme_defaults_to_http() {
        let url = build_backend_url(&rule("backend:9000", ""), "/users", None);
        assert_eq!(url.unwrap(), "http://backend:9000/users");
    }

    #[test]
    fn https_scheme_is_kept() {
        let url = build_backend_url(&rule("https://backend", ""), "/", None);
        assert_eq!(url.unwrap(), "https://backend/");
    }

    #[test]
    fn trailing_slash_on_base_is_trimmed() {
        let url = build_backend_url(&rule("http://backend:9000/", "/v1"), "/users", None);
        assert_eq!(url.unwrap(), "http://backend:9000/v1/users");
    }

    #[test]
    fn leading_slash_is_ensured() {
        let url = build_backend_url(&rule("backend", "v1"), "", None);
        assert_eq!(url.unwrap(), "http://backend/v1");
    }

    #[test]
    fn empty_query_is_dropped() {
        let url = build_backend_url(&rule("backend", ""), "/users", Some(""));
        assert_eq!(url.unwrap(), "http://backend/users");
    }

    #[test]
    fn path_is_not_normalized() {
        let url = build_backend_url(&rule("backend", ""), "/a/../b%20c", None);
        assert_eq!(url.unwrap(), "http://backend/a/../b%20c");
    }

    #[test]
    fn empty_base_is_an_error() {
        let err = build_backend_url(&rule("", ""), "/users", None).unwrap_err();
        assert!(err.to_string().contains("backend base URL is empty"));
    }
}
