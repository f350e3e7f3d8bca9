use async_trait::async_trait;
use uuid::Uuid;

use crate::account::role::Role;
use crate::account::user::User;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgAccountStore;

/// Persistent-store contract consumed by the lifecycle flows.
///
/// Lookups report absent records as `Ok(None)`; `Err` is reserved for
/// infrastructure failure. `save_user` must write the whole record in one
/// statement so a lifecycle transition is never half-applied.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn insert_user(&self, user: &User) -> anyhow::Result<()>;
    async fn save_user(&self, user: &User) -> anyhow::Result<()>;
    async fn get_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>>;
    async fn get_default_role(&self) -> anyhow::Result<Option<Role>>;
    async fn upsert_role(&self, name: &str, permissions: i64, is_default: bool)
        -> anyhow::Result<Role>;
}
