use thiserror::Error;

/// Recoverable outcomes of credential verification and lifecycle
/// transitions. Callers pick user-facing messaging from the variant;
/// only `Store` carries a fatal infrastructure failure.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Wrong password or unknown account at the login boundary. The two
    /// cases are never distinguished here.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Signature mismatch, malformed token, or a token presented for a
    /// purpose other than the one it was issued for.
    #[error("token is invalid")]
    TokenInvalid,

    /// Signature checked out but the embedded expiry has passed. Kept
    /// separate from `TokenInvalid` so callers can offer a fresh link.
    #[error("token has expired")]
    TokenExpired,

    /// Token is valid and unexpired but its subject does not match the
    /// user it is being applied to.
    #[error("token subject does not match this account")]
    SubjectMismatch,

    #[error("user not found")]
    UserNotFound,

    #[error("email address is already registered")]
    EmailTaken,

    #[error("username is already taken")]
    UsernameTaken,

    #[error("malformed email address")]
    InvalidEmail,

    /// Persistent store failure; propagated fatal.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
