//! Session token verification.
//!
//! Tokens are RS256 JWTs issued by the identity provider; they are verified
//! locally against the instance's PEM public key, so no network call is made
//! per request.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid verification key: {0}")]
    Key(jsonwebtoken::errors::Error),

    #[error("invalid session token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("session token has no subject")]
    MissingSubject,

    #[error("authorized party '{0}' is not allowed")]
    UnauthorizedParty(String),
}

/// Resolves a bearer token to the caller's user id.
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<String, SessionError>;
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    /// Origin the token was minted for.
    azp: Option<String>,
}

pub struct ClerkSessionVerifier {
    key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl ClerkSessionVerifier {
    pub fn from_pem(pem: &str, authorized_parties: Vec<String>) -> Result<Self, SessionError> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(SessionError::Key)?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_nbf = true;
        // Session tokens carry no audience; `azp` is checked instead.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            key,
            validation,
            authorized_parties,
        })
    }
}

impl SessionVerifier for ClerkSessionVerifier {
    fn verify(&self, token: &str) -> Result<String, SessionError> {
        let claims = decode::<SessionClaims>(token, &self.key, &self.validation)?.claims;

        if claims.sub.is_empty() {
            return Err(SessionError::MissingSubject);
        }
        if let Some(azp) = claims.azp {
            if !self.authorized_parties.is_empty() && !self.authorized_parties.contains(&azp) {
                return Err(SessionError::UnauthorizedParty(azp));
            }
        }
        Ok(claims.sub)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
