use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, info};

use crate::{
    auth::{cookie::session_token, jwt::JwtKeys, services::who_am_i},
    state::AppState,
};

/// Where unauthenticated callers of a protected page are sent.
pub const LOGIN_PAGE: &str = "/";

/// Page-level session check: any whoAmI failure redirects to the login page.
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers());
    let keys = JwtKeys::from_ref(&state);

    match who_am_i(state.store.as_ref(), &keys, token.as_deref()).await {
        Ok(account) => {
            debug!(account_id = %account.id, path = %request.uri().path(), "session accepted");
            next.run(request).await
        }
        Err(e) => {
            info!(reason = %e, path = %request.uri().path(), "redirecting unauthenticated caller");
            Redirect::to(LOGIN_PAGE).into_response()
        }
    }
}
