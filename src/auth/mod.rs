//! Credential Verification
//!
//! Identity-token issuance lives outside this backend; what it consumes is
//! a single black-box operation, `verify(token, audience) -> claims or
//! failure`. [`TokenVerifier`] is the concrete stand-in: HS256 validation
//! with a shared secret, checking signature, expiry, and audience. Swapping
//! in a JWKS-backed verifier changes nothing above this module.
//!
//! Credentials arrive either as an `Authorization: Bearer` header or as an
//! `id_token` cookie - the cookie path exists because browsers cannot set
//! headers on WebSocket opens.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// Verified identity claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier
    pub sub: String,
    /// Email
    #[serde(default)]
    pub email: String,
    /// Given name, when the identity provider supplies one
    #[serde(default)]
    pub given_name: Option<String>,
    /// Intended audience
    pub aud: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

impl Claims {
    /// Display-name fallback chain used when attributing posts
    pub fn display_name(&self) -> &str {
        match self.given_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                if self.email.is_empty() {
                    "anon"
                } else {
                    &self.email
                }
            }
        }
    }
}

/// Verifies bearer credentials against a shared secret and audience
#[derive(Clone)]
pub struct TokenVerifier {
    secret: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            audience: audience.into(),
        }
    }

    /// Verify a token and return its claims
    ///
    /// Checks signature, expiry, and audience. Failures collapse to
    /// [`Error::AuthRequired`]; callers get no oracle about which check
    /// failed.
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let key = DecodingKey::from_secret(self.secret.as_ref());
        let mut validation = Validation::default();
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| Error::AuthRequired(format!("invalid token: {e}")))?;
        Ok(data.claims)
    }
}

/// Issue a token for local development and tests
///
/// Production tokens come from the external identity provider; this mirrors
/// its output closely enough for the verifier.
pub fn mint_token(
    secret: &str,
    audience: &str,
    sub: &str,
    email: &str,
    given_name: Option<&str>,
) -> Result<String, Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::AuthRequired(format!("clock error: {e}")))?
        .as_secs();

    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        given_name: given_name.map(|s| s.to_string()),
        aud: audience.to_string(),
        exp: now + 60 * 60,
        iat: now,
    };

    let key = EncodingKey::from_secret(secret.as_ref());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| Error::AuthRequired(format!("failed to sign token: {e}")))
}

/// Pull the raw credential out of the request headers
///
/// Prefers `Authorization: Bearer <token>`, falling back to the `id_token`
/// cookie.
pub fn credential_from_headers(headers: &HeaderMap) -> Result<String, Error> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Ok(token.to_string());
        }
    }

    if let Some(cookies) = headers.get(COOKIE).and_then(|h| h.to_str().ok()) {
        for pair in cookies.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=') {
                if name == "id_token" {
                    return Ok(value.to_string());
                }
            }
        }
    }

    Err(Error::AuthRequired("not authenticated".into()))
}

/// Axum extractor for the verified caller
///
/// Handlers take `AuthUser(claims)` as a parameter; extraction verifies the
/// credential against the state's [`TokenVerifier`] and rejects with 401.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenVerifier: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = TokenVerifier::from_ref(state);
        let token = credential_from_headers(&parts.headers)?;
        let claims = verifier.verify(&token)?;
        Ok(AuthUser(claims))
    }
}
