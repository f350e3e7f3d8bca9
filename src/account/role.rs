use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Capability bits granted through roles. A role grants `requested` iff
/// every requested bit is set in its mask.
pub struct Permission;

impl Permission {
    pub const VIEW: i64 = 0x01;
    pub const CREATE_RESTAURANT: i64 = 0x02;
    pub const EDIT_MENU: i64 = 0x04;
    pub const MODERATE: i64 = 0x08;
    pub const ADMINISTER: i64 = 0x80;
}

pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// Fixed seed table: (name, permission mask, is-default). Exactly one row
/// is flagged default; seeding upserts by name and never duplicates.
pub const ROLE_TABLE: &[(&str, i64, bool)] = &[
    ("User", Permission::VIEW, true),
    (
        "Moderator",
        Permission::VIEW | Permission::CREATE_RESTAURANT | Permission::EDIT_MENU | Permission::MODERATE,
        false,
    ),
    (ADMINISTRATOR_ROLE, 0xff, false),
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permissions: i64,
    pub is_default: bool,
}

impl Role {
    pub fn grants(&self, requested: i64) -> bool {
        self.permissions & requested == requested
    }
}
