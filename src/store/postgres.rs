use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::account::role::Role;
use crate::account::user::User;
use crate::store::AccountStore;

/// Postgres-backed store. Every user mutation is a single UPDATE, so a
/// lifecycle transition commits whole or not at all.
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run account migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_user(&self, clause: &str, bind: &str) -> anyhow::Result<Option<User>> {
        let query = format!(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.confirmed,
                   u.pending_email, u.name, u.location, u.about_me,
                   u.member_since, u.last_seen,
                   r.id AS role_id, r.name AS role_name,
                   r.permissions AS role_permissions, r.is_default AS role_is_default
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE {clause}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: Option<String>,
    confirmed: bool,
    pending_email: Option<String>,
    name: Option<String>,
    location: Option<String>,
    about_me: Option<String>,
    member_since: OffsetDateTime,
    last_seen: OffsetDateTime,
    role_id: Option<Uuid>,
    role_name: Option<String>,
    role_permissions: Option<i64>,
    role_is_default: Option<bool>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let role = match (row.role_id, row.role_name, row.role_permissions, row.role_is_default) {
            (Some(id), Some(name), Some(permissions), Some(is_default)) => Some(Role {
                id,
                name,
                permissions,
                is_default,
            }),
            _ => None,
        };
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            confirmed: row.confirmed,
            pending_email: row.pending_email,
            name: row.name,
            location: row.location,
            about_me: row.about_me,
            role,
            member_since: row.member_since,
            last_seen: row.last_seen,
        }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn get_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.confirmed,
                   u.pending_email, u.name, u.location, u.about_me,
                   u.member_since, u.last_seen,
                   r.id AS role_id, r.name AS role_name,
                   r.permissions AS role_permissions, r.is_default AS role_is_default
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.fetch_user("u.email = $1", email).await
    }

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        self.fetch_user("u.username = $1", username).await
    }

    async fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, confirmed,
                               pending_email, name, location, about_me, role_id,
                               member_since, last_seen)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.confirmed)
        .bind(&user.pending_email)
        .bind(&user.name)
        .bind(&user.location)
        .bind(&user.about_me)
        .bind(user.role.as_ref().map(|r| r.id))
        .bind(user.member_since)
        .bind(user.last_seen)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_user(&self, user: &User) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, confirmed = $5,
                pending_email = $6, name = $7, location = $8, about_me = $9,
                role_id = $10, last_seen = $11
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.confirmed)
        .bind(&user.pending_email)
        .bind(&user.name)
        .bind(&user.location)
        .bind(&user.about_me)
        .bind(user.role.as_ref().map(|r| r.id))
        .bind(user.last_seen)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("save of unknown user {}", user.id);
        }
        Ok(())
    }

    async fn get_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, permissions, is_default
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn get_default_role(&self) -> anyhow::Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, name, permissions, is_default
            FROM roles
            WHERE is_default
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn upsert_role(
        &self,
        name: &str,
        permissions: i64,
        is_default: bool,
    ) -> anyhow::Result<Role> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (id, name, permissions, is_default)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE
            SET permissions = EXCLUDED.permissions,
                is_default = EXCLUDED.is_default
            RETURNING id, name, permissions, is_default
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(permissions)
        .bind(is_default)
        .fetch_one(&self.pool)
        .await?;
        Ok(role)
    }
}
