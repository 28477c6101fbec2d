//! Cache-Control policy for the static site

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::Environment;

const NO_CACHE: &str = "no-cache";
const ONE_YEAR: &str = "public, max-age=31536000";
const ONE_DAY: &str = "public, max-age=86400";
const NO_MAX_AGE: &str = "public, max-age=0";

/// Cache-Control value for a static path, `None` for API routes.
///
/// HTML is always revalidated. Scripts and stylesheets under `/assets/` are
/// cached for a year in every environment; the rest of `/assets/` only in
/// production. Other files are cached for a day in production.
pub fn cache_control_for(path: &str, production: bool) -> Option<&'static str> {
    if path.starts_with("/api/") {
        return None;
    }

    if path.ends_with('/') || path.ends_with(".html") {
        return Some(NO_CACHE);
    }

    if path.starts_with("/assets/") {
        if path.ends_with(".js") || path.ends_with(".css") || production {
            return Some(ONE_YEAR);
        }
        return Some(NO_MAX_AGE);
    }

    Some(if production { ONE_DAY } else { NO_MAX_AGE })
}

/// Set Cache-Control on static responses
pub async fn static_cache_middleware(
    State(environment): State<Environment>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let mut response = next.run(req).await;

    let status = response.status();
    if !status.is_success() && status != StatusCode::NOT_MODIFIED {
        return response;
    }

    if let Some(value) = cache_control_for(&path, environment.is_production()) {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
    }
    response
}
