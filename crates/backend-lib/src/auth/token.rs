// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Compact signed bearer tokens.
//!
//! A token is `base64url(header).base64url(claims).base64url(signature)` where
//! the signature is HMAC-SHA-512 over the first two segments joined by a dot.
//! Timestamps inside the claims are epoch milliseconds.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use super::key::SigningKey;
use crate::config::JwtSettings;
use crate::error::{AppError, AuthError};

type HmacSha512 = Hmac<Sha512>;

/// Signature algorithm announced in every header
pub const TOKEN_ALGORITHM: &str = "HS512";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Identity claims carried by a token. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to
    pub sub: String,
    /// Comma-joined role list as stored for the account
    #[serde(default)]
    pub roles: String,
    /// Issue time, epoch milliseconds
    pub iat: i64,
    /// Expiry time, epoch milliseconds
    pub exp: i64,
}

impl Claims {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.exp
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Issues and verifies tokens with one derived key.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    key: SigningKey,
    ttl_ms: u64,
}

impl TokenCodec {
    /// Create a codec. A zero TTL is raised to one millisecond so that
    /// `exp > iat` always holds.
    pub fn new(key: SigningKey, ttl_ms: u64) -> Self {
        Self {
            key,
            ttl_ms: ttl_ms.max(1),
        }
    }

    pub fn from_settings(settings: &JwtSettings) -> Self {
        Self::new(
            SigningKey::derive(settings.secret.expose_secret()),
            settings.expiration_ms,
        )
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// Issue a token for `subject` at `now_ms`
    pub fn issue(&self, subject: &str, roles: &str, now_ms: i64) -> Result<String, AppError> {
        let ttl = i64::try_from(self.ttl_ms).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: subject.to_string(),
            roles: roles.to_string(),
            iat: now_ms,
            exp: now_ms.saturating_add(ttl),
        };
        let header = Header {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let mut token = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?));

        let signature = self.mac()?.chain_update(token.as_bytes()).finalize().into_bytes();
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(signature));
        Ok(token)
    }

    /// Issue a token using the current wall-clock time
    pub fn issue_now(&self, subject: &str, roles: &str) -> Result<String, AppError> {
        self.issue(subject, roles, now_ms())
    }

    /// Verify a token against the current wall-clock time
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, now_ms())
    }

    /// Verify a token as of `now_ms`.
    ///
    /// The signature is checked before anything inside the token is decoded,
    /// and expiry is only considered once the signature is known to be good.
    pub fn verify_at(&self, token: &str, now_ms: i64) -> Result<Claims, AuthError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::MalformedToken);
        };
        if header.is_empty() || payload.is_empty() || signature.is_empty() {
            return Err(AuthError::MalformedToken);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::MalformedToken)?;
        let signing_input = &token[..header.len() + 1 + payload.len()];

        self.mac()?
            .chain_update(signing_input.as_bytes())
            .verify_slice(&signature)
            .map_err(|_| AuthError::InvalidSignature)?;

        let header: Header = decode_segment(header)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(AuthError::MalformedToken);
        }
        let claims: Claims = decode_segment(payload)?;

        if claims.is_expired_at(now_ms) {
            return Err(AuthError::ExpiredToken);
        }
        Ok(claims)
    }

    /// True iff the token verifies now and was issued to `expected_username`
    pub fn validate(&self, token: &str, expected_username: &str) -> bool {
        self.validate_at(token, expected_username, now_ms())
    }

    pub fn validate_at(&self, token: &str, expected_username: &str, now_ms: i64) -> bool {
        matches!(self.verify_at(token, now_ms), Ok(claims) if claims.sub == expected_username)
    }

    /// Username of a currently valid token
    pub fn subject_of(&self, token: &str) -> Result<String, AuthError> {
        self.verify(token).map(|claims| claims.sub)
    }

    fn mac(&self) -> Result<HmacSha512, AuthError> {
        HmacSha512::new_from_slice(self.key.as_bytes())
            .map_err(|e| AuthError::KeyMaterial(e.to_string()))
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)
}
