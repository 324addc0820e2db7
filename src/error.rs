use std::error::Error;
use std::fmt;

/// Failures reported by the sync backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    LockPoisoned(&'static str),
    ConcurrentWrite {
        key: String,
        expected: u64,
        actual: u64,
    },
    /// The identity's session was revoked; nothing can be written for it.
    SessionInvalidated,
    Unauthenticated,
    Transport(String),
    Serde(String),
    UnknownFunction(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            ServiceError::ConcurrentWrite {
                key,
                expected,
                actual,
            } => write!(
                f,
                "concurrent write detected for {} (expected version {}, got {})",
                key, expected, actual
            ),
            ServiceError::SessionInvalidated => write!(f, "session is no longer valid"),
            ServiceError::Unauthenticated => write!(f, "no authenticated identity"),
            ServiceError::Transport(msg) => write!(f, "{}", msg),
            ServiceError::Serde(msg) => write!(f, "serialization error: {}", msg),
            ServiceError::UnknownFunction(name) => write!(f, "unknown function: {}", name),
        }
    }
}

impl Error for ServiceError {}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Serde(err.to_string())
    }
}

impl From<bitcode::Error> for ServiceError {
    fn from(err: bitcode::Error) -> Self {
        ServiceError::Serde(err.to_string())
    }
}

/// Anonymous sign-in failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError(pub ServiceError);

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to log in: {}", self.0)
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// Opening the synchronized session failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenError(pub ServiceError);

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to open session: {}", self.0)
    }
}

impl Error for OpenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

/// Outcome of a failed launch: either sign-in or session open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Auth(AuthError),
    Open(OpenError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Auth(e) => write!(f, "{}", e),
            SessionError::Open(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Auth(e) => Some(e),
            SessionError::Open(e) => Some(e),
        }
    }
}

impl From<AuthError> for SessionError {
    fn from(err: AuthError) -> Self {
        SessionError::Auth(err)
    }
}

impl From<OpenError> for SessionError {
    fn from(err: OpenError) -> Self {
        SessionError::Open(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoritesError {
    /// The session is anonymous; the caller must prompt registration instead.
    Unauthorized { user_id: String },
    /// The user record could not be read; nothing was written.
    ReadFailed(String),
    /// The transaction could not be committed; favorites are unchanged.
    WriteConflict(String),
    /// The user record is not part of the synchronized snapshot.
    MissingUser(String),
}

impl fmt::Display for FavoritesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FavoritesError::Unauthorized { user_id } => {
                write!(f, "user {} must register before saving favorites", user_id)
            }
            FavoritesError::ReadFailed(msg) | FavoritesError::WriteConflict(msg) => {
                write!(f, "{}", msg)
            }
            FavoritesError::MissingUser(id) => write!(f, "user record {} is not available", id),
        }
    }
}

impl Error for FavoritesError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferencesError {
    /// Transport or server failure, carrying its description.
    RemoteError(String),
    /// The function ran but reported an application-level error.
    UserError(String),
    /// The function succeeded without returning a result document.
    MalformedResult,
}

impl fmt::Display for PreferencesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferencesError::RemoteError(msg) => write!(f, "{}", msg),
            PreferencesError::UserError(msg) => write!(f, "{}", msg),
            PreferencesError::MalformedResult => {
                write!(f, "Unexpected result returned from server")
            }
        }
    }
}

impl Error for PreferencesError {}

impl From<ServiceError> for PreferencesError {
    fn from(err: ServiceError) -> Self {
        PreferencesError::RemoteError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_write_display() {
        let err = ServiceError::ConcurrentWrite {
            key: "users:u1".into(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "concurrent write detected for users:u1 (expected version 2, got 3)"
        );
    }

    #[test]
    fn transport_error_displays_description_only() {
        let err = PreferencesError::from(ServiceError::Transport("network is down".into()));
        assert_eq!(err, PreferencesError::RemoteError("network is down".into()));
        assert_eq!(err.to_string(), "network is down");
    }

    #[test]
    fn malformed_result_message() {
        assert_eq!(
            PreferencesError::MalformedResult.to_string(),
            "Unexpected result returned from server"
        );
    }

    #[test]
    fn session_error_exposes_source() {
        let err = SessionError::from(OpenError(ServiceError::Unauthenticated));
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "failed to open session: no authenticated identity"
        );
    }
}
