use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::account::role::{Role, ADMINISTRATOR_ROLE, ROLE_TABLE};
use crate::account::token::{TokenKeys, TokenPurpose};
use crate::account::user::User;
use crate::config::AccountsConfig;
use crate::error::AccountError;
use crate::mailer::{templates, DispatchOutcome, Mailer};
use crate::store::AccountStore;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Input for a new registration. Form-level checks (matching password
/// fields, username shape) stay with the caller.
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
}

/// A committed registration plus the confirmation-mail outcome.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub mail: DispatchOutcome,
}

/// Confirming twice succeeds; the second call reports the no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    AlreadyConfirmed,
}

/// Account lifecycle flows over an abstract store and mailer. Every
/// operation takes its acting or target user explicitly; there is no
/// ambient current-user context.
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    keys: TokenKeys,
    admin_email: Option<String>,
    mail_sender: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        config: &AccountsConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            keys: TokenKeys::from_config(config),
            admin_email: config.admin_email.as_deref().map(normalize_email),
            mail_sender: config.mail_sender.clone(),
        }
    }

    pub fn token_keys(&self) -> &TokenKeys {
        &self.keys
    }

    /// Idempotent upsert of the fixed role table, keyed by role name.
    /// Safe to run at every startup and concurrently with traffic.
    #[instrument(skip(self))]
    pub async fn seed_roles(&self) -> Result<(), AccountError> {
        for (name, permissions, is_default) in ROLE_TABLE {
            self.store
                .upsert_role(name, *permissions, *is_default)
                .await?;
            debug!(role = %name, permissions = *permissions, is_default = *is_default, "role seeded");
        }
        Ok(())
    }

    /// Creates an unconfirmed account, assigns a role, and dispatches a
    /// confirmation token to the registered address.
    #[instrument(skip(self, new), fields(username = %new.username))]
    pub async fn register(&self, new: NewAccount) -> Result<Registration, AccountError> {
        let email = normalize_email(&new.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AccountError::InvalidEmail);
        }
        if self.store.get_user_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AccountError::EmailTaken);
        }
        if self
            .store
            .get_user_by_username(&new.username)
            .await?
            .is_some()
        {
            warn!(username = %new.username, "username already taken");
            return Err(AccountError::UsernameTaken);
        }

        let mut user = User::new(new.username, email);
        user.set_password(&new.password)?;
        user.name = new.name;
        user.location = new.location;
        user.about_me = new.about_me;
        user.role = self.role_for(&user.email).await?;
        if user.role.is_none() {
            warn!(user_id = %user.id, "no default role seeded; user created role-less");
        }
        self.store.insert_user(&user).await?;

        let token = self.keys.sign_confirm(user.id)?;
        let mail = self
            .dispatch(
                &user.email,
                "Confirm Your Account",
                templates::CONFIRM,
                &user,
                &token,
            )
            .await;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(Registration { user, mail })
    }

    /// The administrator address gets the all-bits role, everyone else
    /// the default role. Creation proceeds role-less when neither exists.
    async fn role_for(&self, email: &str) -> Result<Option<Role>, AccountError> {
        if self.admin_email.as_deref() == Some(email) {
            if let Some(role) = self.store.get_role_by_name(ADMINISTRATOR_ROLE).await? {
                return Ok(Some(role));
            }
        }
        Ok(self.store.get_default_role().await?)
    }

    /// Login check: unknown email and wrong password collapse into the
    /// same `InvalidCredentials`. Success records a last-seen ping.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = normalize_email(email);
        let mut user = match self.store.get_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                warn!(email = %email, "login unknown email");
                return Err(AccountError::InvalidCredentials);
            }
        };
        if !user.verify_password(password) {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AccountError::InvalidCredentials);
        }
        user.ping();
        self.store.save_user(&user).await?;
        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    /// Applies a confirmation token to the acting user. Re-confirming an
    /// already-confirmed account is a successful no-op, before any token
    /// inspection.
    #[instrument(skip(self, user, token), fields(user_id = %user.id))]
    pub async fn confirm(
        &self,
        user: &mut User,
        token: &str,
    ) -> Result<ConfirmOutcome, AccountError> {
        if user.confirmed {
            debug!(user_id = %user.id, "already confirmed");
            return Ok(ConfirmOutcome::AlreadyConfirmed);
        }
        let claims = self.keys.verify(token, TokenPurpose::Confirm)?;
        if claims.sub != user.id {
            warn!(user_id = %user.id, token_sub = %claims.sub, "confirmation subject mismatch");
            return Err(AccountError::SubjectMismatch);
        }
        user.confirmed = true;
        self.store.save_user(user).await?;
        info!(user_id = %user.id, "account confirmed");
        Ok(ConfirmOutcome::Confirmed)
    }

    /// Issues a fresh confirmation token; earlier tokens stay valid until
    /// their own expiry.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn resend_confirmation(&self, user: &User) -> Result<DispatchOutcome, AccountError> {
        let token = self.keys.sign_confirm(user.id)?;
        Ok(self
            .dispatch(
                &user.email,
                "Confirm Your Account",
                templates::CONFIRM,
                user,
                &token,
            )
            .await)
    }

    /// Issues a reset token for a registered address. An unknown address
    /// is `UserNotFound` here so it can be logged; the caller presents a
    /// generic outcome either way and must not leak which it was.
    #[instrument(skip(self))]
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<DispatchOutcome, AccountError> {
        let email = normalize_email(email);
        let user = match self.store.get_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                debug!(email = %email, "password reset for unknown email");
                return Err(AccountError::UserNotFound);
            }
        };
        let token = self.keys.sign_reset(user.id)?;
        // Sent to the resolved target's registered address, never to
        // whichever principal happens to be acting.
        Ok(self
            .dispatch(
                &user.email,
                "Reset Your Password",
                templates::RESET_PASSWORD,
                &user,
                &token,
            )
            .await)
    }

    /// Replaces the password when the token's subject matches the user
    /// resolved by `email`. Leaves confirmation state untouched.
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let email = normalize_email(email);
        let mut user = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or(AccountError::UserNotFound)?;
        let claims = self.keys.verify(token, TokenPurpose::Reset)?;
        if claims.sub != user.id {
            warn!(user_id = %user.id, token_sub = %claims.sub, "reset subject mismatch");
            return Err(AccountError::SubjectMismatch);
        }
        user.set_password(new_password)?;
        self.store.save_user(&user).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    /// Authenticated password change: the old password is re-verified
    /// before the new one is stored.
    #[instrument(skip(self, user, old_password, new_password), fields(user_id = %user.id))]
    pub async fn change_password(
        &self,
        user: &mut User,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if !user.verify_password(old_password) {
            warn!(user_id = %user.id, "password change with wrong old password");
            return Err(AccountError::InvalidCredentials);
        }
        user.set_password(new_password)?;
        self.store.save_user(user).await?;
        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Records the pending address and dispatches the proof token to the
    /// NEW mailbox: the flow proves control of the address being claimed,
    /// not of the current one.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn request_email_change(
        &self,
        user: &mut User,
        new_email: &str,
    ) -> Result<DispatchOutcome, AccountError> {
        let new_email = normalize_email(new_email);
        if !is_valid_email(&new_email) {
            return Err(AccountError::InvalidEmail);
        }
        if self.store.get_user_by_email(&new_email).await?.is_some() {
            return Err(AccountError::EmailTaken);
        }
        user.pending_email = Some(new_email.clone());
        self.store.save_user(user).await?;

        let token = self.keys.sign_change_email(user.id, &new_email)?;
        Ok(self
            .dispatch(
                &new_email,
                "Confirm Your New Email",
                templates::CHANGE_EMAIL,
                user,
                &token,
            )
            .await)
    }

    /// Promotes the pending address when the token's subject matches and
    /// its embedded address still equals `pending_email`. A token from a
    /// superseded request fails the second check.
    #[instrument(skip(self, user, token), fields(user_id = %user.id))]
    pub async fn apply_email_change(
        &self,
        user: &mut User,
        token: &str,
    ) -> Result<(), AccountError> {
        let claims = self.keys.verify(token, TokenPurpose::ChangeEmail)?;
        if claims.sub != user.id {
            warn!(user_id = %user.id, token_sub = %claims.sub, "email change subject mismatch");
            return Err(AccountError::SubjectMismatch);
        }
        let new_email = claims.new_email.ok_or(AccountError::TokenInvalid)?;
        if user.pending_email.as_deref() != Some(new_email.as_str()) {
            warn!(user_id = %user.id, "email change token superseded");
            return Err(AccountError::SubjectMismatch);
        }
        user.email = new_email;
        user.pending_email = None;
        self.store.save_user(user).await?;
        info!(user_id = %user.id, email = %user.email, "primary email changed");
        Ok(())
    }

    /// Hands the message to the mailer after the state transition has
    /// committed. The outcome goes back to the caller; it never undoes
    /// the transition.
    async fn dispatch(
        &self,
        to: &str,
        subject: &str,
        template_id: &str,
        user: &User,
        token: &str,
    ) -> DispatchOutcome {
        let context = json!({
            "from": self.mail_sender,
            "username": user.username,
            "token": token,
        });
        let outcome = self.mailer.send(to, subject, template_id, context).await;
        match &outcome {
            DispatchOutcome::Sent => debug!(%to, %template_id, "mail dispatched"),
            DispatchOutcome::Failed(reason) => {
                warn!(%to, %template_id, %reason, "mail dispatch failed")
            }
        }
        outcome
    }
}
