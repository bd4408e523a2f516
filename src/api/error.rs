use thiserror::Error;

/// Failure of a request to the evaluation backend.
///
/// Payloads are plain strings so the error can travel inside
/// [`crate::poller::AcquisitionEvent`] to every subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The run exists but its evaluation has not been written yet.
    #[error("evaluation result is not available yet")]
    NotFoundYet,

    #[error("cannot reach the evaluation backend: {0}")]
    Transport(String),

    /// Credentials were rejected; the caller should re-authenticate.
    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("backend returned {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The response could not be read as an evaluation document at all.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Only a not-yet-available result is worth asking for again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::NotFoundYet)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_found_is_retryable() {
        assert!(FetchError::NotFoundYet.is_retryable());
        assert!(!FetchError::Transport("down".into()).is_retryable());
        assert!(!FetchError::Unauthorized("expired".into()).is_retryable());
        assert!(!FetchError::Malformed("eof".into()).is_retryable());
        assert!(!FetchError::Http {
            status: 500,
            detail: "boom".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_display() {
        let err = FetchError::Http {
            status: 502,
            detail: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "backend returned 502: bad gateway");
    }
}
