use thiserror::Error;

/// Errors produced by lookups, refreshes and the local store.
///
/// Remote and local lookups share this type; the variant says what went wrong,
/// not which source failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// No matching location/city in the store or in the geocoding results.
    #[error("{0} not found")]
    NotFound(String),

    /// Host resolution or connection failure.
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location service disabled")]
    ServiceDisabled,

    #[error("{0} timed out")]
    Timeout(String),

    /// The remote answered with a non-success status.
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// A spawned task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Location access errors that invalidate a previously stored current location.
    pub fn is_location_access(&self) -> bool {
        matches!(self, Error::PermissionDenied | Error::ServiceDisabled)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(
                err.url()
                    .map(|u| u.host_str().unwrap_or("request").to_string())
                    .unwrap_or_else(|| "request".to_string()),
            )
        } else if err.is_connect() {
            Error::NetworkUnreachable(err.to_string())
        } else if err.is_decode() {
            Error::Parse(err.to_string())
        } else {
            Error::Request(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}

/// A value read back from the local store after an optional forced refresh.
///
/// `refresh_error` carries the remote failure that was swallowed so the cached
/// value could still be served; callers decide whether staleness is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub struct Synced<T> {
    pub value: T,
    pub refresh_error: Option<Error>,
}

impl<T> Synced<T> {
    pub fn fresh(value: T) -> Self {
        Self { value, refresh_error: None }
    }

    pub fn is_stale(&self) -> bool {
        self.refresh_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_access_errors_are_classified() {
        assert!(Error::PermissionDenied.is_location_access());
        assert!(Error::ServiceDisabled.is_location_access());
        assert!(!Error::NotFound("city".into()).is_location_access());
    }

    #[test]
    fn synced_reports_staleness() {
        let fresh = Synced::fresh(1);
        assert!(!fresh.is_stale());

        let stale = Synced {
            value: 1,
            refresh_error: Some(Error::NetworkUnreachable("dns".into())),
        };
        assert!(stale.is_stale());
    }

    #[test]
    fn not_found_message_names_the_subject() {
        assert_eq!(Error::NotFound("Location".into()).to_string(), "Location not found");
    }
}
