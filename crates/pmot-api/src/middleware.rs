use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{ApiError, AppState, blocking};

/// The caller behind a verified bearer token, loaded fresh from the
/// database for every request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub is_premium: bool,
}

/// Extract and validate the JWT from the Authorization header, then resolve
/// its subject to a live user.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthorized)?;

    let claims = state
        .tokens
        .verify(bearer.token())
        .ok_or(ApiError::Unauthorized)?;

    // A token can outlive its user
    let user = blocking(&state, move |s| s.db.get_user_by_username(&claims.sub))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(Identity {
        id: user.id,
        username: user.username,
        is_premium: user.is_premium,
    });
    Ok(next.run(req).await)
}
