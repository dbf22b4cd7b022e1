//! Permissive CORS for the dashboard front end.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    (header::CONTENT_TYPE, "application/json"),
];

/// Answers preflight requests and stamps CORS headers on every response.
///
/// # Behavior
///
/// - `OPTIONS` short-circuits with `200` and an empty body, before
///   credentials or the body are looked at.
/// - Every other response, errors included, gets the same fixed headers:
///
/// ```text
/// Access-Control-Allow-Origin: *
/// Access-Control-Allow-Headers: Content-Type
/// Content-Type: application/json
/// ```
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, middleware, routing::any};
/// use crate::api::middleware::cors;
///
/// let api = Router::new()
///     .route("/bitly", any(bitly_handler))
///     .layer(middleware::from_fn(cors::layer));
/// ```
pub async fn layer(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(req).await
    };

    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::any};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/echo", any(|| async { "{\"ok\":true}" }))
            .layer(middleware::from_fn(layer))
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/echo")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_headers_on_regular_response() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-headers"],
            "Content-Type"
        );
        assert_eq!(response.headers()["content-type"], "application/json");
    }
}
