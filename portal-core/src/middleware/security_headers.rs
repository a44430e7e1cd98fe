use axum::{extract::Request, http::header, middleware::Next, response::IntoResponse};

/// Security headers for server-rendered pages and proxied resource content.
///
/// Resource previews are shown inline in the lesson view, so `/resources/`
/// responses may be framed by the portal itself.
pub async fn security_headers_middleware(req: Request, next: Next) -> impl IntoResponse {
    let is_resource_route = req.uri().path().starts_with("/resources/");

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        header::HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        header::HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        header::HeaderValue::from_static(
            "default-src 'self'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data:; \
             form-action 'self'; \
             frame-ancestors 'self'",
        ),
    );

    if is_resource_route {
        headers.insert(
            header::X_FRAME_OPTIONS,
            header::HeaderValue::from_static("SAMEORIGIN"),
        );
    } else {
        headers.insert(
            header::X_FRAME_OPTIONS,
            header::HeaderValue::from_static("DENY"),
        );
    }

    response
}
