//! Account lifecycle core for the Menucraft restaurant manager: user
//! identity, password verification, signed single-purpose tokens for
//! confirmation / password reset / email change, and role-based
//! permission checks. The HTTP layer, templates, and restaurant CRUD
//! live elsewhere and call into this crate.

pub mod account;
pub mod config;
pub mod error;
pub mod mailer;
pub mod store;

pub use account::principal::Principal;
pub use account::role::{Permission, Role, ADMINISTRATOR_ROLE, ROLE_TABLE};
pub use account::service::{AccountService, ConfirmOutcome, NewAccount, Registration};
pub use account::token::{TokenClaims, TokenKeys, TokenPurpose};
pub use account::user::User;
pub use config::AccountsConfig;
pub use error::AccountError;
pub use mailer::{DispatchOutcome, Mailer, NullMailer};
pub use store::{AccountStore, MemoryStore, PgAccountStore};
