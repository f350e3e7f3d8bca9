use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::AccountsConfig;
use crate::error::AccountError;

/// What a token was issued for. A token is only ever accepted for the
/// purpose it carries; presenting it anywhere else is `TokenInvalid`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Confirm,
    Reset,
    ChangeEmail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub purpose: TokenPurpose,
    /// Only present on change-email tokens: the address being claimed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_email: Option<String>,
}

/// Signing and verification keys derived from the server secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(secret: &str, default_ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            default_ttl_secs,
        }
    }

    pub fn from_config(config: &AccountsConfig) -> Self {
        Self::new(&config.secret_key, config.token_ttl_secs)
    }

    pub fn sign_confirm(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_ttl(TokenPurpose::Confirm, user_id, None, self.default_ttl_secs)
    }

    pub fn sign_reset(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_ttl(TokenPurpose::Reset, user_id, None, self.default_ttl_secs)
    }

    pub fn sign_change_email(&self, user_id: Uuid, new_email: &str) -> anyhow::Result<String> {
        self.sign_with_ttl(
            TokenPurpose::ChangeEmail,
            user_id,
            Some(new_email.to_owned()),
            self.default_ttl_secs,
        )
    }

    /// Expiry is encoded as an absolute unix timestamp; a non-positive
    /// ttl yields an already-expired token.
    pub fn sign_with_ttl(
        &self,
        purpose: TokenPurpose,
        user_id: Uuid,
        new_email: Option<String>,
        ttl_secs: i64,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl_secs);
        let claims = TokenClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            purpose,
            new_email,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, purpose = ?purpose, "token signed");
        Ok(token)
    }

    /// Pure check: signature, expiry, then purpose. Never touches the store
    /// and never mutates anything.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<TokenClaims, AccountError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<TokenClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AccountError::TokenExpired,
                _ => {
                    debug!(error = %e, "token rejected");
                    AccountError::TokenInvalid
                }
            }
        })?;
        if data.claims.purpose != purpose {
            debug!(expected = ?purpose, got = ?data.claims.purpose, "token purpose mismatch");
            return Err(AccountError::TokenInvalid);
        }
        debug!(user_id = %data.claims.sub, purpose = ?purpose, "token verified");
        Ok(data.claims)
    }
}
