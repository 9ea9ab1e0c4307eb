use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Registered claims managed by the token service; stripped from caller input.
const RESERVED_CLAIMS: [&str; 2] = ["iat", "exp"];

/// Caller-supplied identity claims. `email` is the authorization subject;
/// anything else the client sends rides along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub email: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IdentityClaims {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: IdentityClaims,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Token does not carry an identity claim")]
    MissingIdentity,

    #[error("Token generation error: {0}")]
    Signing(String),
}

/// Issues and verifies HS256 bearer tokens signed with the server secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        // Clients may carry any registered claim; only expiry is enforced.
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000)),
        }
    }

    pub fn issue(&self, identity: IdentityClaims) -> Result<String, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Signs `identity` as if issued at `now`.
    pub fn issue_at(&self, mut identity: IdentityClaims, now: DateTime<Utc>) -> Result<String, TokenError> {
        if identity.email.trim().is_empty() {
            return Err(TokenError::MissingIdentity);
        }
        for reserved in RESERVED_CLAIMS {
            identity.extra.remove(reserved);
        }

        let claims = Claims {
            identity,
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .ok_or_else(|| TokenError::Signing("token lifetime out of range".to_string()))?
                .timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.identity.email.is_empty() {
            return Err(TokenError::MissingIdentity);
        }
        Ok(data.claims)
    }
}
