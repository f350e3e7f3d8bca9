use async_trait::async_trait;
use tracing::debug;

/// Result of handing a message to the delivery backend. A failed dispatch
/// never rolls back the lifecycle transition that triggered it; the flows
/// return the outcome so the caller can pick user-facing messaging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DispatchOutcome::Sent)
    }
}

/// Notification sender, fire-and-forget from the core's perspective.
/// `template_id` names a mail template owned by the delivery layer;
/// `context` carries the values it renders (token, username, sender).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        template_id: &str,
        context: serde_json::Value,
    ) -> DispatchOutcome;
}

/// Sink for embedders that handle notifications elsewhere.
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        template_id: &str,
        _context: serde_json::Value,
    ) -> DispatchOutcome {
        debug!(%to, %subject, %template_id, "mail discarded by NullMailer");
        DispatchOutcome::Sent
    }
}

/// Template ids understood by the delivery layer.
pub mod templates {
    pub const CONFIRM: &str = "auth/email/confirm";
    pub const RESET_PASSWORD: &str = "auth/email/reset_password";
    pub const CHANGE_EMAIL: &str = "auth/email/change_email";
}
