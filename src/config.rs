use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// Server-wide signing secret for confirmation/reset/email-change tokens.
    pub secret_key: String,
    /// Default token lifetime in seconds.
    pub token_ttl_secs: i64,
    /// Registrations from this address are auto-assigned the Administrator role.
    pub admin_email: Option<String>,
    /// Sender identity stamped on outgoing notification mail.
    pub mail_sender: String,
}

impl AccountsConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret_key = std::env::var("SECRET_KEY")?;
        let token_ttl_secs = std::env::var("TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3600);
        let admin_email = std::env::var("ADMIN_EMAIL")
            .ok()
            .map(|v| v.trim().to_lowercase());
        let mail_sender = std::env::var("MAIL_SENDER")
            .unwrap_or_else(|_| "Menucraft <no-reply@menucraft.local>".into());
        Ok(Self {
            secret_key,
            token_ttl_secs,
            admin_email,
            mail_sender,
        })
    }
}

#[cfg(test)]
impl AccountsConfig {
    pub fn for_tests() -> Self {
        Self {
            secret_key: "test-secret".into(),
            token_ttl_secs: 3600,
            admin_email: Some("admin@menucraft.local".into()),
            mail_sender: "Menucraft <no-reply@menucraft.local>".into(),
        }
    }
}
