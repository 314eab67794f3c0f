//! Client identification utilities
//!
//! Identifies the caller of a request for per-client rate limiting.
//! Forwarding headers are client-controlled, so they are only read when the
//! socket peer is a configured trusted proxy.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Key used when no address can be determined. All such callers share
/// one bucket.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extract the client IP address of a request
///
/// Returns the socket peer unless it is listed in `trusted_proxies`. Behind a
/// trusted proxy the right-most `X-Forwarded-For` entry that is not itself a
/// trusted proxy wins, then `X-Real-IP`, then the peer.
pub fn extract_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<IpAddr> {
    match direct_ip {
        Some(peer) if trusted_proxies.contains(&peer) => {
            forwarded_ip(headers, trusted_proxies).or(Some(peer))
        }
        other => other,
    }
}

fn forwarded_ip(headers: &HeaderMap, trusted_proxies: &[IpAddr]) -> Option<IpAddr> {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        for entry in xff.rsplit(',') {
            match entry.trim().parse::<IpAddr>() {
                Ok(ip) if trusted_proxies.contains(&ip) => continue,
                Ok(ip) => return Some(ip),
                Err(_) => break,
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
}

/// Stable client key for rate limiting: the client IP, or [`UNKNOWN_CLIENT`].
pub fn client_key(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> String {
    extract_client_ip(headers, direct_ip, trusted_proxies)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
