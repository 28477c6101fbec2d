//! Client identity extraction

use axum::{
    extract::ConnectInfo,
    http::{header, Extensions, HeaderMap, Method, Uri},
};
use std::net::SocketAddr;

use crate::observability::RequestContext;

/// Fallback identity when the peer address is unknown
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the client IP used as rate-limit key.
///
/// The first `X-Forwarded-For` hop is only honoured when the service is
/// configured to trust its proxy; otherwise the socket peer address is used.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> String {
    let forwarded = trust_proxy
        .then(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .flatten();

    forwarded
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// Capture the request details attached to log events
pub fn request_context(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_proxy: bool,
) -> RequestContext {
    RequestContext {
        method: method.to_string(),
        url: uri.to_string(),
        ip: client_ip(headers, extensions, trust_proxy),
        user_agent: header_string(headers, header::USER_AGENT),
        referer: header_string(headers, header::REFERER),
    }
}
