// Detection pipeline error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Detection error code constants
///
/// These constants provide a single source of truth for error codes
/// reported by the detection pipeline, suitable for UI bindings that
/// switch on numeric codes rather than enum variants.
///
/// Error code range: 1001-1006
pub struct DetectorErrorCodes {}

impl DetectorErrorCodes {
    /// Frame source unavailable (camera permission refused or missing device)
    pub const PERMISSION_DENIED: i32 = 1001;

    /// Session is already running
    pub const ALREADY_RUNNING: i32 = 1002;

    /// Session is not running
    pub const NOT_RUNNING: i32 = 1003;

    /// Frame source failed after it was opened
    pub const SOURCE_FAILURE: i32 = 1004;

    /// Detection configuration is out of range
    pub const CONFIG_INVALID: i32 = 1005;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1006;

    /// Session was stopped; stop is terminal, there is no resume
    pub const SESSION_TERMINATED: i32 = 1007;
}

/// Log a detector error with structured context
///
/// Logs with error_code and component fields so failures can be grepped
/// out of mixed logs. Non-blocking, never panics.
pub fn log_detector_error(err: &DetectorError, context: &str) {
    error!(
        "Detector error in {}: code={}, component=SessionEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Detection pipeline errors
///
/// These errors cover session lifecycle and frame acquisition. Per-tick
/// classification never fails: a source that is not producing frames yet
/// is a tick outcome, not an error.
///
/// Error code range: 1001-1006
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// Frame source unavailable (camera permission refused or missing device)
    PermissionDenied,

    /// Session is already running
    AlreadyRunning,

    /// Session is not running
    NotRunning,

    /// Frame source failed after it was opened
    SourceFailure { reason: String },

    /// Detection configuration is out of range
    ConfigInvalid { reason: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Session was stopped; stop is terminal, there is no resume
    SessionTerminated,
}

impl ErrorCode for DetectorError {
    fn code(&self) -> i32 {
        match self {
            DetectorError::PermissionDenied => DetectorErrorCodes::PERMISSION_DENIED,
            DetectorError::AlreadyRunning => DetectorErrorCodes::ALREADY_RUNNING,
            DetectorError::NotRunning => DetectorErrorCodes::NOT_RUNNING,
            DetectorError::SourceFailure { .. } => DetectorErrorCodes::SOURCE_FAILURE,
            DetectorError::ConfigInvalid { .. } => DetectorErrorCodes::CONFIG_INVALID,
            DetectorError::LockPoisoned { .. } => DetectorErrorCodes::LOCK_POISONED,
            DetectorError::SessionTerminated => DetectorErrorCodes::SESSION_TERMINATED,
        }
    }

    fn message(&self) -> String {
        match self {
            DetectorError::PermissionDenied => {
                "Unable to access the frame source. Please grant camera permission.".to_string()
            }
            DetectorError::AlreadyRunning => {
                "Session already running. Call stop() first.".to_string()
            }
            DetectorError::NotRunning => {
                "Session not running. Call start() first.".to_string()
            }
            DetectorError::SourceFailure { reason } => {
                format!("Frame source failed: {}", reason)
            }
            DetectorError::ConfigInvalid { reason } => {
                format!("Invalid detection configuration: {}", reason)
            }
            DetectorError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            DetectorError::SessionTerminated => {
                "Session was stopped. Stop is terminal; create a new session.".to_string()
            }
        }
    }
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DetectorError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for DetectorError {}

impl From<std::io::Error> for DetectorError {
    fn from(err: std::io::Error) -> Self {
        DetectorError::SourceFailure {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_error_codes() {
        assert_eq!(
            DetectorError::PermissionDenied.code(),
            DetectorErrorCodes::PERMISSION_DENIED
        );
        assert_eq!(
            DetectorError::AlreadyRunning.code(),
            DetectorErrorCodes::ALREADY_RUNNING
        );
        assert_eq!(DetectorError::NotRunning.code(), DetectorErrorCodes::NOT_RUNNING);
        assert_eq!(
            DetectorError::ConfigInvalid {
                reason: "threshold".to_string()
            }
            .code(),
            DetectorErrorCodes::CONFIG_INVALID
        );
    }

    #[test]
    fn test_messages_are_nonempty() {
        let errors = [
            DetectorError::PermissionDenied,
            DetectorError::AlreadyRunning,
            DetectorError::NotRunning,
            DetectorError::SourceFailure {
                reason: "device unplugged".to_string(),
            },
            DetectorError::ConfigInvalid {
                reason: "hue out of range".to_string(),
            },
            DetectorError::LockPoisoned {
                component: "channels".to_string(),
            },
        ];
        for err in &errors {
            assert!(!err.message().is_empty());
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no device");
        let err: DetectorError = io_err.into();
        assert!(matches!(err, DetectorError::SourceFailure { .. }));
    }
}
