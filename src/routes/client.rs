use std::net::{IpAddr, SocketAddr};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use crate::security::client_fingerprint;
use crate::AppState;

/// Proxy headers carrying a single client address, in priority order
const SINGLE_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "true-client-ip",
    "x-client-ip",
    "x-cluster-client-ip",
];

const FALLBACK_IP: &str = "127.0.0.1";

/// Client IP address used as the throttling identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Resolve the client address from proxy headers, then the socket peer
pub fn resolve_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header_ip(headers, "x-real-ip") {
        return ip.to_string();
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    if let Some(ip) = SINGLE_IP_HEADERS
        .iter()
        .find_map(|name| header_ip(headers, name))
    {
        return ip.to_string();
    }

    match peer.map(|addr| addr.ip()) {
        Some(IpAddr::V6(v6)) if v6.is_loopback() => FALLBACK_IP.to_string(),
        Some(IpAddr::V6(v6)) => v6
            .to_ipv4_mapped()
            .map(|v4| v4.to_string())
            .unwrap_or_else(|| v6.to_string()),
        Some(ip) => ip.to_string(),
        None => {
            tracing::warn!("Could not determine client IP, using fallback");
            FALLBACK_IP.to_string()
        }
    }
}

impl ClientIp {
    /// Resolve from request parts; the peer address is present only when the
    /// server was started with connect info
    pub fn from_parts(parts: &Parts) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        ClientIp(resolve_client_ip(&parts.headers, peer))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[derive(Debug, Serialize)]
pub struct ClientIdResponse {
    pub ip: String,
    pub timestamp: String,
}

/// Obfuscated identifier for the calling client
///
/// GET /api/client-id
pub async fn client_id(State(state): State<AppState>, ClientIp(ip): ClientIp) -> Json<ClientIdResponse> {
    Json(ClientIdResponse {
        ip: client_fingerprint(&ip, &state.config.admin_key),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_real_ip_wins() {
        let h = headers(&[("x-real-ip", "1.2.3.4"), ("x-forwarded-for", "5.6.7.8")]);
        assert_eq!(resolve_client_ip(&h, None), "1.2.3.4");
    }

    #[test]
    fn test_forwarded_for_uses_first_entry() {
        let h = headers(&[("x-forwarded-for", " 5.6.7.8 , 10.0.0.1")]);
        assert_eq!(resolve_client_ip(&h, None), "5.6.7.8");
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let h = headers(&[
            ("x-real-ip", "not-an-ip"),
            ("x-forwarded-for", "garbage"),
            ("cf-connecting-ip", "2001:db8::1"),
        ]);
        assert_eq!(resolve_client_ip(&h, None), "2001:db8::1");
    }

    #[test]
    fn test_peer_address_fallbacks() {
        let empty = HeaderMap::new();

        let v4: SocketAddr = "9.8.7.6:5555".parse().unwrap();
        assert_eq!(resolve_client_ip(&empty, Some(v4)), "9.8.7.6");

        let loopback: SocketAddr = "[::1]:5555".parse().unwrap();
        assert_eq!(resolve_client_ip(&empty, Some(loopback)), "127.0.0.1");

        let mapped: SocketAddr = "[::ffff:9.8.7.6]:5555".parse().unwrap();
        assert_eq!(resolve_client_ip(&empty, Some(mapped)), "9.8.7.6");

        assert_eq!(resolve_client_ip(&empty, None), "127.0.0.1");
    }
}
