//! Audit logging middleware.
//!
//! Logs every protected API request with user id, method, path, and
//! response status. Runs innermost (after auth has injected `Claims`).

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::crypto::Claims;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let user_id = req.extensions().get::<Claims>().map(|c| c.id);

    let response = next.run(req).await;

    tracing::info!(
        target: "audit",
        user_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        "API access"
    );

    response
}
