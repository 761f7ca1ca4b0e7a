//! Exchanging credentials for a bearer token.

use std::error::Error;
use std::fmt;

use tracing::debug;

use serde_json::json;

use crate::api::{Backend, Endpoint, HttpError};

use super::keyring::{KeyringAccessError, TokenStore};

pub const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please check your credentials.";

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials(&'static str),
    Rejected(HttpError),
    MissingToken,
    Storage(KeyringAccessError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredentials(field) => write!(f, "{field} is required."),
            AuthError::Rejected(err) => write!(f, "{err}"),
            AuthError::MissingToken => write!(f, "Server response did not include a token."),
            AuthError::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AuthError::Rejected(err) => Some(err),
            AuthError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HttpError> for AuthError {
    fn from(err: HttpError) -> Self {
        AuthError::Rejected(err)
    }
}

impl From<KeyringAccessError> for AuthError {
    fn from(err: KeyringAccessError) -> Self {
        AuthError::Storage(err)
    }
}

async fn request_token<B>(
    backend: &B,
    endpoint: Endpoint,
    body: serde_json::Value,
) -> Result<String, AuthError>
where
    B: Backend + ?Sized,
{
    let payload = backend.send(endpoint, body, None).await?;
    let token = payload
        .string_field("token")
        .filter(|token| !token.trim().is_empty())
        .ok_or(AuthError::MissingToken)?;
    debug!(endpoint = endpoint.name(), "received token");
    Ok(token.to_string())
}

/// `POST /auth/login` with email and password.
pub async fn login_with_password<B>(
    backend: &B,
    email: &str,
    password: &str,
) -> Result<String, AuthError>
where
    B: Backend + ?Sized,
{
    if email.trim().is_empty() {
        return Err(AuthError::MissingCredentials("Email"));
    }
    if password.is_empty() {
        return Err(AuthError::MissingCredentials("Password"));
    }
    let body = json!({ "email": email.trim(), "password": password });
    request_token(backend, Endpoint::Login, body).await
}

/// `POST /auth/google` with an access token obtained from Google sign-in.
pub async fn login_with_google<B>(backend: &B, token_id: &str) -> Result<String, AuthError>
where
    B: Backend + ?Sized,
{
    let token_id = token_id.trim();
    if token_id.is_empty() {
        return Err(AuthError::MissingCredentials("Google token"));
    }
    let body = json!({ "tokenId": token_id });
    request_token(backend, Endpoint::GoogleLogin, body).await
}

/// Message shown to the user after a failed email/password login.
///
/// Input problems are reported as-is; anything the server said is
/// collapsed into the generic credentials hint.
pub fn password_login_failure_message(err: &AuthError) -> String {
    match err {
        AuthError::MissingCredentials(_) | AuthError::Storage(_) => err.to_string(),
        AuthError::Rejected(_) | AuthError::MissingToken => LOGIN_FAILED_MESSAGE.to_string(),
    }
}

/// Persist a freshly issued token.
pub fn remember_token(store: &TokenStore, token: &str) -> Result<(), AuthError> {
    store.store(token)?;
    Ok(())
}
