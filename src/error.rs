//! Error types

/// Crate-level error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure (binding the listener, reading a config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A configuration file could not be parsed
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::Config("buffer_capacity must be greater than zero".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: buffer_capacity must be greater than zero"
        );
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
