//! Error types for gres

use thiserror::Error;

/// `errno` value reported for queries a plugin does not implement
pub const EINVAL: i32 = 22;

/// Main error type for gres
#[derive(Error, Debug)]
pub enum GresError {
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed identifier in a configuration entry
    #[error("can't parse gres.conf identifier record ({identifier}): {reason}")]
    ConfigParse { identifier: String, reason: String },

    /// No allocation bitmap resolves for the job/step/node context
    #[error("unable to set env vars, no device files configured: {0}")]
    NoAllocationData(String),

    /// Bitmap length does not match the number of devices in the inventory
    #[error(
        "gres list is not equal to the number of gres_devices ({bitmap_len} bits, {device_count} devices)"
    )]
    InventoryMismatch {
        bitmap_len: usize,
        device_count: usize,
    },

    /// Bit position outside a bitmap
    #[error("bit {index} out of range for bitmap of {len} bits")]
    BitOutOfRange { index: usize, len: usize },

    /// Query operation the plugin does not implement
    #[error("Invalid argument: {0} is not supported")]
    UnsupportedQuery(String),

    /// Inventory handoff between processes failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GresError {
    /// The `errno` equivalent of this error, as reported to the scheduler
    pub fn errno(&self) -> i32 {
        match self {
            GresError::UnsupportedQuery(_) => EINVAL,
            GresError::Io(e) => e.raw_os_error().unwrap_or(EINVAL),
            _ => EINVAL,
        }
    }

    /// Whether this is the expected outcome of an unsupported query
    pub fn is_unsupported(&self) -> bool {
        matches!(self, GresError::UnsupportedQuery(_))
    }
}

/// Result type for gres operations
pub type GresResult<T> = Result<T, GresError>;

impl From<serde_json::Error> for GresError {
    fn from(err: serde_json::Error) -> Self {
        GresError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for GresError {
    fn from(err: toml::de::Error) -> Self {
        GresError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GresError::Config("invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: invalid config");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GresError = io_err.into();
        assert!(matches!(err, GresError::Io(_)));
    }

    #[test]
    fn test_unsupported_is_einval() {
        let err = GresError::UnsupportedQuery("job_info".to_string());
        assert!(err.is_unsupported());
        assert_eq!(err.errno(), EINVAL);
        assert_eq!(err.to_string(), "Invalid argument: job_info is not supported");
    }

    #[test]
    fn test_mismatch_display() {
        let err = GresError::InventoryMismatch {
            bitmap_len: 3,
            device_count: 4,
        };
        assert!(err.to_string().contains("3 bits, 4 devices"));
        assert!(!err.is_unsupported());
    }
}
