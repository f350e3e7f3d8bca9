use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::account::password::{hash_password, verify_password};
use crate::account::role::{Permission, Role};

/// User record as held by the persistent store.
///
/// The password hash is write-only outside this crate: it is set through
/// `set_password` and checked through `verify_password`, with no public
/// accessor and no JSON representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub(crate) password_hash: Option<String>,
    pub confirmed: bool,
    /// New address awaiting proof of control before it becomes primary.
    pub pending_email: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub role: Option<Role>,
    pub member_since: OffsetDateTime,
    pub last_seen: OffsetDateTime,
}

impl User {
    /// Fresh unconfirmed record with no role and no password yet.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: None,
            confirmed: false,
            pending_email: None,
            name: None,
            location: None,
            about_me: None,
            role: None,
            member_since: now,
            last_seen: now,
        }
    }

    /// Overwrites any previous hash. The plaintext is never stored.
    pub fn set_password(&mut self, plain: &str) -> anyhow::Result<()> {
        self.password_hash = Some(hash_password(plain)?);
        Ok(())
    }

    /// An account with no password set matches nothing.
    pub fn verify_password(&self, plain: &str) -> bool {
        match &self.password_hash {
            Some(hash) => verify_password(plain, hash),
            None => false,
        }
    }

    pub fn can(&self, requested: i64) -> bool {
        match &self.role {
            Some(role) => role.grants(requested),
            None => false,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.can(Permission::ADMINISTER)
    }

    /// Last-seen ping, recorded on every successful login.
    pub fn ping(&mut self) {
        self.last_seen = OffsetDateTime::now_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_with(permissions: i64) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: "test-role".into(),
            permissions,
            is_default: false,
        }
    }

    #[test]
    fn set_password_then_verify() {
        let mut user = User::new("alice", "alice@example.com");
        user.set_password("cat-dog-bird").expect("set password");
        assert!(user.verify_password("cat-dog-bird"));
        assert!(!user.verify_password("cat-dog-fish"));
    }

    #[test]
    fn set_password_overwrites_previous_hash() {
        let mut user = User::new("alice", "alice@example.com");
        user.set_password("first").expect("set password");
        user.set_password("second").expect("set password");
        assert!(!user.verify_password("first"));
        assert!(user.verify_password("second"));
    }

    #[test]
    fn verify_fails_closed_without_password() {
        let user = User::new("alice", "alice@example.com");
        assert!(!user.verify_password(""));
        assert!(!user.verify_password("anything"));
    }

    #[test]
    fn can_is_false_without_role() {
        let user = User::new("alice", "alice@example.com");
        assert!(!user.can(Permission::VIEW));
        assert!(!user.is_administrator());
    }

    #[test]
    fn can_checks_mask_containment() {
        let mut user = User::new("alice", "alice@example.com");
        user.role = Some(role_with(0x81));
        assert!(user.can(Permission::VIEW | Permission::ADMINISTER));
        assert!(user.is_administrator());

        user.role = Some(role_with(0x01));
        assert!(user.can(Permission::VIEW));
        assert!(!user.can(Permission::ADMINISTER));
        assert!(!user.is_administrator());
    }
}
