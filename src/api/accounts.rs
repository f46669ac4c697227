use axum::{http::StatusCode, response::IntoResponse, Extension};
use chrono::NaiveDateTime;
use miette::Result;
use serde::{Deserialize, Serialize};

use crate::{
    api::{ApiConfig, ApiError, Json},
    auth::{self, SessionToken},
    repository::{account, Repository},
};

/// Handler for `POST /api/signup`
pub async fn signup(
    Extension(repository): Extension<Repository>,
    request: Json<Signup>,
) -> Result<impl IntoResponse, ApiError> {
    let request = request.0;

    if request.name.trim().is_empty()
        || request.email.trim().is_empty()
        || request.password.is_empty()
    {
        return Err(ApiError::Validation("Missing required fields".to_string()));
    }

    let password_hash = auth::hash_password(&request.password)?;

    let account: Account = repository
        .account()
        .create(account::CreateAccount {
            name: request.name,
            email: request.email,
            password_hash,
        })
        .await?
        .into();

    Ok((StatusCode::CREATED, Json(account)))
}

/// Handler for `POST /api/signin`
pub async fn signin(
    Extension(repository): Extension<Repository>,
    Extension(config): Extension<ApiConfig>,
    request: Json<Signin>,
) -> Result<Json<Session>, ApiError> {
    let request = request.0;

    let account = repository
        .account()
        .find_by_email(&request.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !auth::verify_password(&request.password, &account.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    let session = repository
        .session()
        .create(account.id, config.session_ttl)
        .await?;

    Ok(Json(Session {
        token: session.token,
        expires_at: session.expires_at,
        user: account.into(),
    }))
}

/// Handler for `POST /api/signout`
pub async fn signout(
    Extension(repository): Extension<Repository>,
    Extension(token): Extension<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    repository.session().delete(&token.0).await?;
    Ok(StatusCode::OK)
}

impl From<account::Account> for Account {
    fn from(account: account::Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
        }
    }
}

/// Body for `POST /api/signup`
#[derive(Debug, Serialize, Deserialize)]
pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Body for `POST /api/signin`
#[derive(Debug, Serialize, Deserialize)]
pub struct Signin {
    pub email: String,
    pub password: String,
}

/// An API [`Account`] type. The credential hash never leaves the server.
#[derive(Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Response for `POST /api/signin`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub expires_at: NaiveDateTime,
    pub user: Account,
}
