//! Click metadata extraction from HTTP request headers.

use axum::http::{HeaderMap, header};
use std::net::{IpAddr, SocketAddr};

use crate::domain::click_event::ClickContext;

/// Country header set by Cloudflare and compatible CDNs.
pub const COUNTRY_HEADER: &str = "cf-ipcountry";

/// Builds the click context for a resolve request.
///
/// The client IP comes from the peer socket address unless `behind_proxy` is
/// set, in which case the first `X-Forwarded-For` entry (or `X-Real-IP`) wins.
/// Values that are not valid UTF-8 are treated as absent.
///
/// # Examples
///
/// ```ignore
/// let ctx = click_context_from_headers(&headers, Some(peer), false);
/// assert_eq!(ctx.client_ip.as_deref(), Some("127.0.0.1"));
/// ```
pub fn click_context_from_headers(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    behind_proxy: bool,
) -> ClickContext {
    let forwarded_ip = behind_proxy
        .then(|| forwarded_client_ip(headers))
        .flatten();
    let client_ip = forwarded_ip.or_else(|| peer.map(|addr| addr.ip().to_string()));

    let country = header_str(headers, COUNTRY_HEADER)
        .filter(|c| c.len() == 2 && !c.eq_ignore_ascii_case("XX"));

    ClickContext::new(
        client_ip,
        header_str(headers, header::USER_AGENT.as_str()),
        header_str(headers, header::REFERER.as_str()),
        country,
    )
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    let candidate = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .or_else(|| header_str(headers, "x-real-ip"))?;

    candidate.parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("127.0.0.1:12345".parse().unwrap())
    }

    #[test]
    fn test_uses_peer_address_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));

        let ctx = click_context_from_headers(&headers, peer(), false);
        assert_eq!(ctx.client_ip.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_uses_forwarded_for_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        let ctx = click_context_from_headers(&headers, peer(), true);
        assert_eq!(ctx.client_ip.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_falls_back_to_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        let ctx = click_context_from_headers(&headers, peer(), true);
        assert_eq!(ctx.client_ip.as_deref(), Some("198.51.100.2"));

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        let ctx = click_context_from_headers(&headers, peer(), true);
        assert_eq!(ctx.client_ip.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn test_reads_user_agent_referer_and_country() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://google.com"));
        headers.insert(COUNTRY_HEADER, HeaderValue::from_static("DE"));

        let ctx = click_context_from_headers(&headers, None, false);
        assert_eq!(ctx.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(ctx.referrer.as_deref(), Some("https://google.com"));
        assert_eq!(ctx.country.as_deref(), Some("DE"));
        assert!(ctx.client_ip.is_none());
    }

    #[test]
    fn test_ignores_unknown_country() {
        let mut headers = HeaderMap::new();
        headers.insert(COUNTRY_HEADER, HeaderValue::from_static("XX"));

        let ctx = click_context_from_headers(&headers, None, false);
        assert!(ctx.country.is_none());
    }
}
