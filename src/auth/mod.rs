use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Claims carried by platform-issued access tokens. Anything not modelled here is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(sub: Option<String>, email: Option<String>, role: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub,
            email,
            role: Some(role.into()),
            aud: None,
            exp,
            iat: Some(now.timestamp()),
            extra: Map::new(),
        }
    }

    pub fn with_audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("{0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// HS256 signing and verification keys derived from the shared project secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: &str, audience: Option<&str>) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            // Tokens minted by the platform carry an `aud` that would otherwise be rejected
            None => validation.validate_aud = false,
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        Self::new(&security.jwt_secret, security.jwt_audience.as_deref())
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret-with-enough-length-for-hs256";

    #[test]
    fn sign_then_verify_keeps_claims() {
        let keys = JwtKeys::new(SECRET, None).unwrap();
        let mut claims = Claims::new(Some("user-1".into()), Some("a@example.com".into()), "authenticated", 1);
        claims.extra.insert("session_id".into(), json!("s-42"));

        let token = keys.sign(&claims).unwrap();
        let verified = keys.verify(&token).unwrap();

        assert_eq!(verified, claims);
        assert_eq!(verified.extra.get("session_id"), Some(&json!("s-42")));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issuer = JwtKeys::new("another-secret-with-enough-length-for-hs256", None).unwrap();
        let keys = JwtKeys::new(SECRET, None).unwrap();
        let token = issuer.sign(&Claims::new(None, None, "anon", 1)).unwrap();

        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let keys = JwtKeys::new(SECRET, None).unwrap();
        let mut claims = Claims::new(None, None, "anon", 1);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = keys.sign(&claims).unwrap();

        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn audience_is_enforced_when_configured() {
        let keys = JwtKeys::new(SECRET, Some("authenticated")).unwrap();
        let anon = keys.sign(&Claims::new(None, None, "anon", 1).with_audience("other")).unwrap();
        let user = keys
            .sign(&Claims::new(Some("u".into()), None, "authenticated", 1).with_audience("authenticated"))
            .unwrap();

        assert!(keys.verify(&anon).is_err());
        assert!(keys.verify(&user).is_ok());
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(JwtKeys::new("", None), Err(AuthError::MissingSecret)));
    }
}
