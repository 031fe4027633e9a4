//! CLI error handling with user-facing messages and exit codes.

use std::path::PathBuf;
use std::process;
use terraslope_analysis::{AnalysisError, ErrorCategory};
use terraslope_dem::DemError;
use thiserror::Error;

/// Errors surfaced by the `terraslope` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file is unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A command argument could not be used.
    #[error("Invalid input: {0}")]
    Input(String),

    /// A file could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written.
    #[error("Failed to write '{}': {source}", .path.display())]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Standard output could not be written.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// A result could not be encoded.
    #[error("Failed to encode result: {0}")]
    Encode(String),

    /// Logging could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// The metrics recorder could not be installed.
    #[error("Failed to install metrics recorder: {0}")]
    Metrics(String),

    /// The analysis failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Elevation access failed outside an analysis.
    #[error(transparent)]
    Elevation(#[from] DemError),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Error classes reported to the user, each with its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorKind {
    /// Bad polygon, spacing, line or coordinate.
    Validation,
    /// Elevation resolution ran out of time.
    Timeout,
    /// Bad configuration file or logging filter.
    Configuration,
    /// Anything else.
    Internal,
}

impl CliErrorKind {
    /// Short name used in messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CliErrorKind::Validation => "validation",
            CliErrorKind::Timeout => "timeout",
            CliErrorKind::Configuration => "configuration",
            CliErrorKind::Internal => "internal",
        }
    }

    /// Process exit code.
    pub const fn exit_code(&self) -> i32 {
        match self {
            CliErrorKind::Internal => 1,
            CliErrorKind::Validation => 2,
            CliErrorKind::Timeout => 3,
            CliErrorKind::Configuration => 4,
        }
    }
}

impl CliError {
    /// Classify this error.
    pub fn kind(&self) -> CliErrorKind {
        match self {
            CliError::Config(_) | CliError::Logging(_) => CliErrorKind::Configuration,
            CliError::Input(_) | CliError::Read { .. } => CliErrorKind::Validation,
            CliError::Analysis(e) => match e.category() {
                ErrorCategory::Validation => CliErrorKind::Validation,
                ErrorCategory::Timeout => CliErrorKind::Timeout,
                ErrorCategory::Internal => CliErrorKind::Internal,
            },
            CliError::Elevation(DemError::Timeout(_)) => CliErrorKind::Timeout,
            CliError::Elevation(DemError::InvalidZoomLevel(_)) => CliErrorKind::Validation,
            CliError::Elevation(_)
            | CliError::Write { .. }
            | CliError::Output(_)
            | CliError::Encode(_)
            | CliError::Metrics(_) => CliErrorKind::Internal,
        }
    }

    /// Print the error and exit with the code of its kind.
    pub fn exit(&self) -> ! {
        let kind = self.kind();
        eprintln!("Error ({}): {}", kind.as_str(), self);

        match kind {
            CliErrorKind::Timeout => {
                eprintln!();
                eprintln!("Elevation tiles did not arrive in time. Try a larger --timeout,");
                eprintln!("a coarser --spacing or a smaller polygon.");
            }
            CliErrorKind::Configuration => {
                eprintln!();
                eprintln!("Run `terraslope config` to print the effective configuration.");
            }
            _ => {}
        }

        process::exit(kind.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_analysis_errors_keep_their_category() {
        let err = CliError::from(AnalysisError::InvalidSpacing(-1.0));
        assert_eq!(err.kind(), CliErrorKind::Validation);
        assert_eq!(err.kind().exit_code(), 2);

        let err = CliError::from(AnalysisError::Timeout(Duration::from_secs(1)));
        assert_eq!(err.kind(), CliErrorKind::Timeout);

        let err = CliError::from(AnalysisError::Elevation(DemError::WorkerLost));
        assert_eq!(err.kind(), CliErrorKind::Internal);
    }

    #[test]
    fn test_messages() {
        let err = CliError::Config("zoom out of range".into());
        assert_eq!(err.to_string(), "Configuration error: zoom out of range");
        assert_eq!(err.kind().as_str(), "configuration");

        // Transparent errors show the analysis message unchanged
        let err = CliError::from(AnalysisError::InvalidSpacing(0.0));
        assert_eq!(err.to_string(), AnalysisError::InvalidSpacing(0.0).to_string());
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            CliErrorKind::Validation,
            CliErrorKind::Timeout,
            CliErrorKind::Configuration,
            CliErrorKind::Internal,
        ]
        .map(|k| k.exit_code());
        for (i, a) in codes.iter().enumerate() {
            assert!(codes[i + 1..].iter().all(|b| a != b));
        }
    }
}
