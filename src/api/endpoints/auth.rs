//! `POST /api/login` (unprotected).

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, LoginRequest, LoginResponse};
use crate::crypto;
use crate::db;
use crate::models::UserSummary;

/// Verify username and password and issue a bearer token.
///
/// Unknown user and wrong password give the same 401.
pub async fn login(
    State(ctx): State<ApiContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;

    let user = {
        let conn = ctx.core.open_db()?;
        db::get_user_by_username(&conn, &request.username)?
    }
    .ok_or(ApiError::Unauthorized(ApiError::BAD_CREDENTIALS))?;

    // PBKDF2 is CPU-bound; keep it off the async workers
    let password = request.password;
    let stored_hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || crypto::verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password check task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("stored hash for user {}: {e}", user.id)))?;
    if !valid {
        tracing::info!(username = %request.username, "Login rejected");
        return Err(ApiError::Unauthorized(ApiError::BAD_CREDENTIALS));
    }

    let token = ctx
        .core
        .signer()
        .issue(&user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(LoginResponse {
        success: true,
        token,
        user: UserSummary::from(&user),
    }))
}
