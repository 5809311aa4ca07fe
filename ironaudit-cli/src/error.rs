//! CLI-specific error types and exit code mapping

use ironaudit_core::error::IronauditError;
use ironaudit_core::types::Severity;
use ironaudit_scanner::ScannerError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The scan finished and reported findings at or above the threshold.
    #[error("found {count} vulnerabilities at or above {threshold}")]
    Findings {
        /// Number of findings at or above the threshold
        count: usize,
        /// `--fail-on` threshold
        threshold: Severity,
    },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from ironaudit-core.
    #[error("{0}")]
    Core(#[from] IronauditError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                 |
    /// |------|-----------------------------------------|
    /// | 0    | Success                                 |
    /// | 1    | General / command error                 |
    /// | 2    | Configuration error                     |
    /// | 4    | Findings at or above `--fail-on`        |
    /// | 10   | IO error                                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(IronauditError::Config(_)) => 2,
            Self::Findings { .. } => 4,
            Self::Io(_) | Self::Core(IronauditError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<ScannerError> for CliError {
    fn from(e: ScannerError) -> Self {
        Self::Core(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironaudit_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = IronauditError::Config(ConfigError::FileNotFound {
            path: "ironaudit.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_findings() {
        let err = CliError::Findings {
            count: 3,
            threshold: Severity::High,
        };
        assert_eq!(err.exit_code(), 4, "findings should return exit code 4");
        assert_eq!(err.to_string(), "found 3 vulnerabilities at or above high");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_scanner_analysis_error_maps_to_command_exit() {
        let err: CliError = ScannerError::Analysis("repository path is not a directory".to_owned()).into();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("repository path is not a directory"));
    }

    #[test]
    fn test_scanner_config_error_maps_to_config_exit() {
        let err: CliError = ScannerError::Config {
            field: "vuln_db_chunk_size".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("expected Io error variant"),
        }
    }
}
