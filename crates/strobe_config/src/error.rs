//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `strobe.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Neither bus width is an integer multiple of the other.
    #[error("incompatible bus widths: input {input} bytes and output {output} bytes are not related by an integer factor")]
    IncompatibleWidths {
        /// Input (slave) side width in bytes.
        input: u32,
        /// Output (master) side width in bytes.
        output: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("device.depth".to_string());
        assert_eq!(format!("{err}"), "missing required field: device.depth");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("at most two clock domains".to_string());
        assert_eq!(
            format!("{err}"),
            "validation error: at most two clock domains"
        );
    }

    #[test]
    fn display_incompatible_widths() {
        let err = ConfigError::IncompatibleWidths {
            input: 3,
            output: 2,
        };
        assert_eq!(
            format!("{err}"),
            "incompatible bus widths: input 3 bytes and output 2 bytes are not related by an integer factor"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
