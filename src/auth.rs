use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::Serialize;

use crate::{api::ApiError, repository::Repository};

const BEARER_PREFIX: &str = "Bearer ";

/// The account resolved from a bearer token, injected into request
/// extensions by [`require_session`].
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub account_id: i64,
    pub name: String,
    pub email: String,
}

/// The raw token the current request authenticated with. Kept alongside
/// [`Identity`] so sign-out can revoke the exact session in use.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

/// Middleware protecting the authenticated part of the API. Resolves the
/// `Authorization: Bearer` token to an account through the sessions table,
/// rejecting missing, unknown and expired tokens with 401.
pub async fn require_session<B>(
    mut req: Request<B>,
    next: Next<B>,
    repository: Repository,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER_PREFIX))
        .map(str::to_owned)
        .ok_or(ApiError::Unauthorized)?;

    let account = repository
        .session()
        .find_account(&token, Utc::now().naive_utc())
        .await?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(Identity {
        account_id: account.account_id,
        name: account.name,
        email: account.email,
    });
    req.extensions_mut().insert(SessionToken(token));

    Ok(next.run(req).await)
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(ApiError::PasswordHash)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
