//! HTTP surface, grouped the way the router nests it: `open` for anonymous
//! traffic, `auth` for the login dance, `my` and `member` for session
//! holders, `admin` for staff.

pub mod admin;
pub mod auth;
pub mod dto;
pub mod member;
pub mod my;
pub mod open;

use axum::http::header::{HOST, USER_AGENT};
use axum::http::HeaderMap;

/// Client address as reported by the reverse proxy. First hop of
/// `X-Forwarded-For`; there is no direct-connection fallback because the
/// service always sits behind a proxy.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

pub(crate) fn request_host(headers: &HeaderMap) -> &str {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_takes_the_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.7, 10.0.0.1".parse().unwrap(),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));

        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn request_host_defaults_to_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, "shop.example.com:443".parse().unwrap());
        assert_eq!(request_host(&headers), "shop.example.com:443");
        assert_eq!(request_host(&HeaderMap::new()), "");
    }
}
