use crate::account::user::User;

/// Acting identity for a request: a loaded user or nobody. Permission
/// checks are total over both variants.
#[derive(Debug, Clone)]
pub enum Principal {
    Authenticated(User),
    Anonymous,
}

impl Principal {
    pub fn can(&self, requested: i64) -> bool {
        match self {
            Principal::Authenticated(user) => user.can(requested),
            Principal::Anonymous => false,
        }
    }

    pub fn is_administrator(&self) -> bool {
        match self {
            Principal::Authenticated(user) => user.is_administrator(),
            Principal::Anonymous => false,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Authenticated(user) => Some(user),
            Principal::Anonymous => None,
        }
    }
}
