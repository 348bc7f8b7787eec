//! Bearer credential verification.
//!
//! Route handlers depend only on the [`AuthGate`] trait. The default
//! [`HmacTokenGate`] issues tokens of the form
//! `base64url(claims) "." hex(hmac_sha256(secret, base64url(claims)))`
//! where the claims carry the subject and an expiry in Unix seconds.
//! [`OpenGate`] is used when auth is disabled in config.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use tc_core::config::AuthConfig;
use tc_core::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Subject reported for every request when auth is disabled.
pub const ANONYMOUS: &str = "anonymous";

/// The caller a credential resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            subject: ANONYMOUS.to_string(),
        }
    }
}

/// A freshly issued bearer token, shaped like an OAuth2 token response.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Verifies (and optionally issues) bearer credentials.
pub trait AuthGate: Send + Sync {
    /// Resolve a credential to an identity or reject it.
    fn verify(&self, token: &str) -> Result<Identity>;

    /// Issue a credential for `subject`.
    fn issue(&self, subject: &str) -> Result<IssuedToken>;

    /// Whether credentials are checked at all.
    fn enforcing(&self) -> bool {
        true
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// HMAC-SHA256 signed, time-limited tokens.
pub struct HmacTokenGate {
    secret: Vec<u8>,
    ttl_secs: u64,
    /// When set, only tokens for this subject are accepted.
    subject: Option<String>,
}

impl HmacTokenGate {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: u64, subject: Option<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
            subject,
        }
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Internal(format!("invalid signing key: {e}")))
    }

    /// Issue a token expiring at `exp` (Unix seconds).
    fn sign(&self, subject: &str, exp: i64) -> Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            exp,
        };
        let json = serde_json::to_vec(&claims)
            .map_err(|e| Error::Internal(format!("failed to encode claims: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }
}

impl AuthGate for HmacTokenGate {
    fn verify(&self, token: &str) -> Result<Identity> {
        let rejected = |reason: &str| Error::Unauthorized(reason.to_string());

        let (payload, signature) = token.split_once('.').ok_or_else(|| rejected("malformed token"))?;
        let signature = hex::decode(signature).map_err(|_| rejected("malformed token"))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| rejected("invalid signature"))?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| rejected("malformed token"))?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| rejected("malformed token"))?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(rejected("token expired"));
        }

        if let Some(ref expected) = self.subject {
            if claims.sub != *expected {
                return Err(rejected("unknown subject"));
            }
        }

        Ok(Identity { subject: claims.sub })
    }

    fn issue(&self, subject: &str) -> Result<IssuedToken> {
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        let exp = Utc::now().timestamp().saturating_add(ttl);
        Ok(IssuedToken {
            access_token: self.sign(subject, exp)?,
            token_type: "bearer",
            expires_in: self.ttl_secs,
        })
    }
}

/// Accepts everything. Used when auth is disabled.
pub struct OpenGate;

impl AuthGate for OpenGate {
    fn verify(&self, _token: &str) -> Result<Identity> {
        Ok(Identity::anonymous())
    }

    fn issue(&self, _subject: &str) -> Result<IssuedToken> {
        Ok(IssuedToken {
            access_token: ANONYMOUS.to_string(),
            token_type: "bearer",
            expires_in: 0,
        })
    }

    fn enforcing(&self) -> bool {
        false
    }
}

/// Build the gate described by `config`.
pub fn build_gate(config: &AuthConfig) -> Arc<dyn AuthGate> {
    if !config.enabled {
        tracing::warn!("Authentication is disabled; all requests are accepted");
        return Arc::new(OpenGate);
    }

    let secret = match config.secret {
        Some(ref secret) if !secret.is_empty() => secret.clone(),
        _ => {
            tracing::warn!("auth.secret not set; generated an ephemeral signing key");
            generate_secret()
        }
    };

    Arc::new(HmacTokenGate::new(
        secret.into_bytes(),
        config.token_ttl_minutes.saturating_mul(60),
        config.username.clone(),
    ))
}

/// Check a username/password pair against the configured account.
pub fn check_credentials(config: &AuthConfig, username: &str, password: &str) -> Result<()> {
    let (Some(expected_user), Some(hash)) = (&config.username, &config.password_hash) else {
        return Err(Error::Unauthorized("authentication not configured".into()));
    };

    if username != expected_user {
        return Err(Error::Unauthorized("Incorrect username or password".into()));
    }

    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(Error::Unauthorized("Incorrect username or password".into())),
    }
}

/// Generate a bcrypt password hash.
pub fn hash_password(password: &str) -> std::result::Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Generate a random signing secret.
pub fn generate_secret() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
