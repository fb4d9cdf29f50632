use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{header, HeaderName, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        cookie::{clear_session_cookie, session_cookie},
        dto::{AuthResponse, LoginRequest, LogoutResponse, MeResponse, SignupRequest},
        extractors::CurrentAccount,
        jwt::JwtKeys,
        services::{self, Session},
    },
    error::AppError,
    state::AppState,
};

type AuthReply = (StatusCode, [(HeaderName, String); 1], Json<AuthResponse>);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(p)| p).map_err(|e| {
        warn!(error = %e, "rejected request body");
        AppError::missing_fields()
    })
}

fn reply(state: &AppState, status: StatusCode, session: Session) -> AuthReply {
    let cookie = session_cookie(
        &session.token,
        state.config.session_max_age_secs(),
        state.config.cookie_secure,
    );
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            ok: true,
            user: session.user,
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<AuthReply, AppError> {
    let payload = body(payload)?;
    let keys = JwtKeys::from_ref(&state);
    let session = services::signup(state.store.as_ref(), &keys, payload).await?;
    Ok(reply(&state, StatusCode::CREATED, session))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<AuthReply, AppError> {
    let payload = body(payload)?;
    let keys = JwtKeys::from_ref(&state);
    let session = services::login(state.store.as_ref(), &keys, payload).await?;
    Ok(reply(&state, StatusCode::OK, session))
}

/// Tokens are stateless; logging out only expires the cookie.
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> ([(HeaderName, String); 1], Json<LogoutResponse>) {
    info!("session cookie cleared");
    (
        [(header::SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
        Json(LogoutResponse { ok: true }),
    )
}

#[instrument(skip_all)]
pub async fn me(CurrentAccount(account): CurrentAccount) -> Json<MeResponse> {
    Json(MeResponse { user: account })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::MemoryAccountStore;
    use axum::{
        body::Body,
        http::{Method, Request},
        response::Response,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(store: Arc<MemoryAccountStore>) -> Router {
        auth_routes().with_state(AppState::fake_with_store(store))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().method(Method::GET).uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        req.body(Body::empty()).unwrap()
    }

    async fn json_body(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn token_cookie(res: &Response) -> String {
        let set_cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn signup_returns_201_with_cookie_and_public_user() {
        let store = Arc::new(MemoryAccountStore::new());
        let res = app(store)
            .oneshot(post_json(
                "/api/auth/signup",
                json!({"name": "Ada", "email": "ada@example.com", "password": "pw"}),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        let set_cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("HttpOnly; Path=/; Max-Age=604800; SameSite=Lax"));

        let body = json_body(res).await;
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["user"]["name"], "Ada");
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert!(body["user"]["id"].is_string());
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn signup_missing_fields_is_400() {
        let store = Arc::new(MemoryAccountStore::new());
        let res = app(store.clone())
            .oneshot(post_json("/api/auth/signup", json!({"email": "ada@example.com"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["error"], "Missing fields");
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let store = Arc::new(MemoryAccountStore::new());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app(store).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_signup_is_409() {
        let store = Arc::new(MemoryAccountStore::new());
        let body = json!({"name": "Ada", "email": "ada@example.com", "password": "pw"});
        let first = app(store.clone())
            .oneshot(post_json("/api/auth/signup", body.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app(store.clone())
            .oneshot(post_json("/api/auth/signup", body))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(second).await["error"], "Email already registered");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn login_wrong_password_and_unknown_email_look_the_same() {
        let store = Arc::new(MemoryAccountStore::new());
        app(store.clone())
            .oneshot(post_json(
                "/api/auth/signup",
                json!({"name": "Ada", "email": "ada@example.com", "password": "right"}),
            ))
            .await
            .unwrap();

        let wrong = app(store.clone())
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": "ada@example.com", "password": "wrong"}),
            ))
            .await
            .unwrap();
        let unknown = app(store.clone())
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": "eve@example.com", "password": "right"}),
            ))
            .await
            .unwrap();

        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert!(wrong.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(json_body(wrong).await, json_body(unknown).await);
    }

    #[tokio::test]
    async fn login_then_me_round_trip() {
        let store = Arc::new(MemoryAccountStore::new());
        app(store.clone())
            .oneshot(post_json(
                "/api/auth/signup",
                json!({"name": "Ada", "email": "ada@example.com", "password": "right"}),
            ))
            .await
            .unwrap();

        let res = app(store.clone())
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": "ada@example.com", "password": "right"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let cookie = token_cookie(&res);

        let me = app(store)
            .oneshot(get_with_cookie("/api/auth/me", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::OK);
        let body = json_body(me).await;
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert!(body["user"]["created_at"].is_string());
        assert!(!body.to_string().contains("argon2"));
    }

    #[tokio::test]
    async fn me_without_cookie_is_401() {
        let res = app(Arc::new(MemoryAccountStore::new()))
            .oneshot(get_with_cookie("/api/auth/me", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["error"], "Not authenticated");
    }

    #[tokio::test]
    async fn me_with_garbage_token_is_401() {
        let res = app(Arc::new(MemoryAccountStore::new()))
            .oneshot(get_with_cookie("/api/auth/me", Some("token=not.a.jwt")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(res).await["error"], "Invalid token");
    }

    #[tokio::test]
    async fn me_for_deleted_account_is_404() {
        let store = Arc::new(MemoryAccountStore::new());
        let res = app(store.clone())
            .oneshot(post_json(
                "/api/auth/signup",
                json!({"name": "Ada", "email": "ada@example.com", "password": "pw"}),
            ))
            .await
            .unwrap();
        let cookie = token_cookie(&res);
        let id: uuid::Uuid = json_body(res).await["user"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        store.remove(id).await;

        let me = app(store)
            .oneshot(get_with_cookie("/api/auth/me", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(me.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_expires_cookie() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap();
        let res = app(Arc::new(MemoryAccountStore::new())).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn signup_rejects_get() {
        let res = app(Arc::new(MemoryAccountStore::new()))
            .oneshot(get_with_cookie("/api/auth/signup", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
