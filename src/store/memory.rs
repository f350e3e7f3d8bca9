use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;
use uuid::Uuid;

use crate::account::role::Role;
use crate::account::user::User;
use crate::store::AccountStore;

/// Map-backed store for tests and single-process embedders. Each method
/// takes the lock once; a mutation lands as a single atomic step.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    roles: HashMap<String, Role>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roles are looked up fresh on every read so a re-seeded mask is
    /// visible to users saved before the re-seed.
    fn resolve_role(inner: &Inner, mut user: User) -> User {
        if let Some(role) = user.role.take() {
            user.role = inner
                .roles
                .values()
                .find(|r| r.id == role.id)
                .cloned()
                .or(Some(role));
        }
        user
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .get(&id)
            .cloned()
            .map(|u| Self::resolve_role(&inner, u)))
    }

    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .map(|u| Self::resolve_role(&inner, u)))
    }

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .map(|u| Self::resolve_role(&inner, u)))
    }

    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.contains_key(&user.id) {
            bail!("duplicate user id {}", user.id);
        }
        if inner.users.values().any(|u| u.email == user.email) {
            bail!("duplicate email {}", user.email);
        }
        if inner.users.values().any(|u| u.username == user.username) {
            bail!("duplicate username {}", user.username);
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save_user(&self, user: &User) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.users.contains_key(&user.id) {
            bail!("save of unknown user {}", user.id);
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.roles.get(name).cloned())
    }

    async fn get_default_role(&self) -> anyhow::Result<Option<Role>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.roles.values().find(|r| r.is_default).cloned())
    }

    async fn upsert_role(
        &self,
        name: &str,
        permissions: i64,
        is_default: bool,
    ) -> anyhow::Result<Role> {
        let mut inner = self.inner.lock().unwrap();
        let role = match inner.roles.get_mut(name) {
            Some(existing) => {
                existing.permissions = permissions;
                existing.is_default = is_default;
                existing.clone()
            }
            None => {
                let role = Role {
                    id: Uuid::new_v4(),
                    name: name.to_owned(),
                    permissions,
                    is_default,
                };
                inner.roles.insert(name.to_owned(), role.clone());
                role
            }
        };
        Ok(role)
    }
}
