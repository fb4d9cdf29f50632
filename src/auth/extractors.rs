use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    auth::{cookie::session_token, dto::AccountProfile, jwt::JwtKeys, services::who_am_i},
    error::AppError,
    state::AppState,
};

/// The authenticated caller, resolved from the session cookie.
pub struct CurrentAccount(pub AccountProfile);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers);
        let keys = JwtKeys::from_ref(state);
        let profile = who_am_i(state.store.as_ref(), &keys, token.as_deref()).await?;
        Ok(CurrentAccount(profile))
    }
}
