//! Error kinds reported by the analyzer.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while analysing a chart.
///
/// Extraction, registry and templates-dir errors abort the run.
/// `BackendFailed` is only ever logged: the searcher turns it into "no match".
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("file not found: {}", .0.display())]
    FileMissing(PathBuf),
    #[error("cannot parse {}: {source}", path.display())]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("no keys found in {}", .0.display())]
    EmptyKeySet(PathBuf),
    #[error("no search backend found on PATH (looked for {0})")]
    BackendMissing(String),
    #[error("{tool} failed with {status}: {stderr}")]
    BackendFailed {
        tool: &'static str,
        status: String,
        stderr: String,
    },
    #[error("pattern {name:?} does not compile: {source}")]
    RegexCompileFailed {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("cannot create scratch file for pattern {name:?}: {source}")]
    ScratchAllocFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("analysis interrupted")]
    Interrupted,
}

impl AnalyzerError {
    /// Map a failed read of `path`: a missing file is `FileMissing`, anything
    /// else (bad UTF-8, permissions) means the document cannot be parsed.
    pub fn from_read(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => AnalyzerError::FileMissing(path.to_path_buf()),
            _ => AnalyzerError::ParseFailed {
                path: path.to_path_buf(),
                source: Box::new(err),
            },
        }
    }

    /// Stable name of the error kind, used in JSON failure output.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzerError::ConfigInvalid(_) => "ConfigInvalid",
            AnalyzerError::FileMissing(_) => "FileMissing",
            AnalyzerError::ParseFailed { .. } => "ParseFailed",
            AnalyzerError::EmptyKeySet(_) => "EmptyKeySet",
            AnalyzerError::BackendMissing(_) => "BackendMissing",
            AnalyzerError::BackendFailed { .. } => "BackendFailed",
            AnalyzerError::RegexCompileFailed { .. } => "RegexCompileFailed",
            AnalyzerError::ScratchAllocFailed { .. } => "ScratchAllocFailed",
            AnalyzerError::Interrupted => "Interrupted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(
            AnalyzerError::ConfigInvalid("x".to_string()).kind(),
            "ConfigInvalid"
        );
        assert_eq!(
            AnalyzerError::BackendMissing("rg, grep".to_string()).kind(),
            "BackendMissing"
        );
        assert_eq!(AnalyzerError::Interrupted.kind(), "Interrupted");
    }

    #[test]
    fn test_file_missing_message() {
        let err = AnalyzerError::FileMissing(PathBuf::from("values.yaml"));
        assert_eq!(err.to_string(), "file not found: values.yaml");
    }

    #[test]
    fn test_from_read_kinds() {
        let path = Path::new("values.yaml");
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(AnalyzerError::from_read(path, missing).kind(), "FileMissing");

        let invalid = io::Error::new(io::ErrorKind::InvalidData, "not valid UTF-8");
        let err = AnalyzerError::from_read(path, invalid);
        assert_eq!(err.kind(), "ParseFailed");
        assert!(err.to_string().contains("valid UTF-8"));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(AnalyzerError::from_read(path, denied).kind(), "ParseFailed");
    }
}
