//! unused-values - find Helm chart values that no template uses.
//!
//! The analyzer reads a chart's values file, extracts every leaf key path
//! (`zeebe.resources.limits.cpu`) and checks whether anything under the
//! templates directory consumes it, either by naming the full path or through
//! a construct that consumes a whole subtree (`toYaml .Values.zeebe`).
//!
//! # Architecture
//!
//! - `config`: runtime options and the optional YAML config file
//! - `display`: levelled terminal output, colours and progress
//! - `keys`: leaf key extraction from the values document
//! - `patterns`: named regex patterns for indirect usage
//! - `search`: pluggable text-search backends (ripgrep, grep)
//! - `finder`: per-key classification on a worker pool
//! - `aggregate`: parent roll-up, summary and exit code
//! - `report`: table and JSON output
//! - `analyzer`: the pipeline tying the above together

pub mod aggregate;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod finder;
pub mod keys;
pub mod patterns;
pub mod report;
pub mod search;
pub mod usage;

pub use analyzer::{Analysis, Analyzer};
pub use config::{Config, SearchTool};
pub use display::{Display, DisplayOptions};
pub use error::AnalyzerError;
pub use finder::{CancelToken, Finder};
pub use patterns::PatternRegistry;
pub use search::{SearchBackend, Searcher};
pub use usage::{KeyUsage, Location, UsageType};
