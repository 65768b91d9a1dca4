// Copyright 2026 Rangeway Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for object-storage backends.

use thiserror::Error;

/// Errors that can occur while talking to an object-storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Object not found in the bucket.
    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound {
        /// Bucket that was searched.
        bucket: String,
        /// Object key that was not found.
        key: String,
    },

    /// Bucket does not exist.
    #[error("Bucket not found: {bucket}")]
    BucketNotFound {
        /// Bucket name that was not found.
        bucket: String,
    },

    /// The backend could not be reached (connect, DNS, TLS, timeout).
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing a body stream failed after the exchange started.
    #[error("Backend I/O error: {0}")]
    Io(String),

    /// The backend answered with a status the client does not expect.
    #[error("Unexpected backend response {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status returned by the backend.
        status: u16,
        /// Error code or body excerpt reported by the backend.
        message: String,
    },

    /// The object key cannot be addressed on this backend.
    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey {
        /// Rejected key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Caller supplied an argument the backend cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl BackendError {
    /// Returns true when the error means the bucket or object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BackendError::ObjectNotFound { .. } | BackendError::BucketNotFound { .. }
        )
    }
}

impl From<BackendError> for std::io::Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::ObjectNotFound { .. } | BackendError::BucketNotFound { .. } => {
                std::io::Error::new(std::io::ErrorKind::NotFound, err)
            }
            other => std::io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let missing = BackendError::ObjectNotFound {
            bucket: "b".to_string(),
            key: "k".to_string(),
        };
        assert!(missing.is_not_found());
        assert!(BackendError::BucketNotFound { bucket: "b".into() }.is_not_found());
        assert!(!BackendError::Io("reset".into()).is_not_found());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: std::io::Error = BackendError::Io("connection reset".into()).into();
        assert_eq!(err.kind(), std::io::ErrorKind::Other);
        assert!(err.to_string().contains("connection reset"));
    }
}
