use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use tracing::{error, warn};
use wellpoints_shared::auth::Role;
use wellpoints_shared::jwt::{self, JwtClaims};

use super::{AppError, AppState};

/// How many days of inactivity before a session is considered expired.
const SESSION_IDLE_DAYS: i64 = 14;
/// How many days before mandatory re-login.
const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct AuthCtx {
    pub claims: JwtClaims,
}

impl AuthCtx {
    pub fn username(&self) -> &str {
        &self.claims.sub
    }

    /// The single capability predicate: cross-user visibility is granted
    /// iff this returns true.
    pub fn is_admin(&self) -> bool {
        self.claims.role == Role::Admin
    }
}

pub async fn require_bearer(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let unauthorized = || Err(AppError::unauthorized());
    let header_val = match req.headers().get(header::AUTHORIZATION) {
        Some(v) => v,
        None => return unauthorized(),
    };
    let header_str = header_val.to_str().map_err(|_| AppError::unauthorized())?;
    let prefix = "Bearer ";
    if !header_str.starts_with(prefix) {
        return unauthorized();
    }
    let token = &header_str[prefix.len()..];

    let claims = match jwt::decode_and_verify(token, state.config.jwt_secret.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error=%e, "auth: jwt decode failed");
            return unauthorized();
        }
    };

    validate_claims(&state, &claims).map_err(|e| {
        warn!(error=?e, username=%claims.sub, "auth: validate_claims failed");
        // Invalid token, log out the user
        AppError::unauthorized()
    })?;

    let jti = claims.jti.clone();
    let cutoff = Utc::now() - Duration::days(SESSION_IDLE_DAYS);
    match state
        .store
        .touch_session_with_cutoff(&jti, cutoff.naive_utc())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                jti = %jti,
                username = %claims.sub,
                cutoff = %cutoff,
                "auth: session missing or expired (last_used_at < cutoff)"
            );
            return unauthorized();
        }
        Err(e) => {
            error!(jti = %jti, error=%e, "auth: touch_session_with_cutoff failed");
            return Err(AppError::internal(e));
        }
    }
    let auth = AuthCtx { claims };
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

pub async fn issue_jwt_for_user(
    state: &AppState,
    username: &str,
    role: Role,
) -> Result<String, AppError> {
    let jti = uuid::Uuid::new_v4().to_string();
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp();
    let claims = JwtClaims {
        sub: username.to_string(),
        jti: jti.clone(),
        exp,
        role,
    };

    validate_claims(state, &claims)?;

    state
        .store
        .create_session(&jti, username)
        .await
        .map_err(|e| {
            error!(username, error=%e, "login: create_session failed");
            AppError::internal(e)
        })?;
    let token = jwt::encode(&claims, state.config.jwt_secret.as_bytes()).map_err(|e| {
        error!(username, error=%e, "login: jwt encode failed");
        AppError::internal(e)
    })?;
    Ok(token)
}

/// Claims must name a configured user whose role matches the token role.
/// Users removed from the config lose access on their next request.
fn validate_claims(state: &AppState, claims: &JwtClaims) -> Result<(), AppError> {
    let user = state.config.find_user(&claims.sub).ok_or_else(|| {
        warn!(username = %claims.sub, "auth: unknown user");
        AppError::forbidden()
    })?;

    if user.role != claims.role {
        warn!(
            username = %claims.sub,
            token_role = ?claims.role,
            actual_role = ?user.role,
            "auth: role mismatch"
        );
        return Err(AppError::forbidden());
    }

    Ok(())
}
