//! Text search over the templates directory.
//!
//! Searching is delegated to an external tool:
//! - ripgrep (`rg`), preferred when available
//! - `grep -r`, the portable fallback
//!
//! Both are driven through the [`SearchBackend`] trait and produce
//! `path:line:content` output that is parsed into [`FileLineMatch`]es.

mod grep;
mod ripgrep;

pub use grep::Grep;
pub use ripgrep::Ripgrep;

use lazy_static::lazy_static;
use regex::Regex;
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::SearchTool;
use crate::display::Display;
use crate::error::AnalyzerError;
use crate::patterns::Pattern;

lazy_static! {
    static ref MATCH_LINE: Regex = Regex::new(r"^(.+?):(\d+):(.*)$").unwrap();
}

/// One matching line reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLineMatch {
    pub file: String,
    pub line: usize,
    pub content: String,
}

/// What to look for.
#[derive(Debug, Clone, Copy)]
pub enum Query<'a> {
    /// A fixed string, e.g. a full dotted key.
    Literal(&'a str),
    /// A registered regex pattern.
    Pattern(&'a Pattern),
}

/// A text-search implementation.
pub trait SearchBackend: Send + Sync {
    /// Short tool name used in logs (e.g. "rg").
    fn name(&self) -> &'static str;

    /// Search `dir` recursively. No match is `Ok` with an empty list.
    fn search(&self, query: Query<'_>, dir: &Path) -> Result<Vec<FileLineMatch>, AnalyzerError>;
}

/// Runs queries against a backend, absorbing backend failures.
pub struct Searcher {
    backend: Box<dyn SearchBackend>,
}

impl Searcher {
    pub fn new(backend: Box<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Pick a backend from `PATH`. `None` prefers rg and falls back to grep.
    pub fn detect(preferred: Option<SearchTool>) -> Result<Self, AnalyzerError> {
        Self::detect_in(preferred, env::var_os("PATH").as_deref())
    }

    /// Like [`Searcher::detect`] with an explicit `PATH` value.
    pub fn detect_in(
        preferred: Option<SearchTool>,
        path_var: Option<&OsStr>,
    ) -> Result<Self, AnalyzerError> {
        let candidates: &[SearchTool] = match preferred {
            Some(SearchTool::Ripgrep) => &[SearchTool::Ripgrep],
            Some(SearchTool::Grep) => &[SearchTool::Grep],
            None => &[SearchTool::Ripgrep, SearchTool::Grep],
        };

        for tool in candidates {
            if let Some(binary) = find_on_path(tool.binary(), path_var) {
                let backend: Box<dyn SearchBackend> = match tool {
                    SearchTool::Ripgrep => Box::new(Ripgrep::new(binary)),
                    SearchTool::Grep => Box::new(Grep::new(binary)),
                };
                return Ok(Self::new(backend));
            }
        }

        let names: Vec<&str> = candidates.iter().map(|t| t.binary()).collect();
        Err(AnalyzerError::BackendMissing(names.join(", ")))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run `query`; failures are logged at debug level and yield no matches.
    pub fn search(&self, query: Query<'_>, dir: &Path, display: &Display) -> Vec<FileLineMatch> {
        match self.backend.search(query, dir) {
            Ok(matches) => matches,
            Err(e) => {
                display.debug(&format!("{} search failed: {}", self.backend.name(), e));
                Vec::new()
            }
        }
    }
}

/// Execute a prepared search command and interpret its exit status.
///
/// 0 means matches, 1 means none, anything else is a failure.
pub(crate) fn run_tool(
    mut command: Command,
    tool: &'static str,
) -> Result<Vec<FileLineMatch>, AnalyzerError> {
    let output = command.output().map_err(|e| AnalyzerError::BackendFailed {
        tool,
        status: "spawn error".to_string(),
        stderr: e.to_string(),
    })?;

    match output.status.code() {
        Some(0) => Ok(parse_output(&String::from_utf8_lossy(&output.stdout))),
        Some(1) => Ok(Vec::new()),
        _ => Err(AnalyzerError::BackendFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}

/// Parse `path:line:content` lines. Lines without that shape are skipped.
pub fn parse_output(stdout: &str) -> Vec<FileLineMatch> {
    stdout
        .lines()
        .filter_map(|line| {
            let caps = MATCH_LINE.captures(line)?;
            Some(FileLineMatch {
                file: caps[1].to_string(),
                line: caps[2].parse().ok()?,
                content: caps[3].to_string(),
            })
        })
        .collect()
}

fn find_on_path(binary: &str, path_var: Option<&OsStr>) -> Option<PathBuf> {
    let path_var = path_var?;
    env::split_paths(path_var).find_map(|dir| {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = dir.join(format!("{}.exe", binary));
        exe.is_file().then_some(exe)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_output() {
        let out = "templates/deployment.yaml:12:  image: {{ .Values.image.tag }}\n\
                   templates/_helpers.tpl:3:{{- define \"x\" -}}: y\n";
        let matches = parse_output(out);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].file, "templates/deployment.yaml");
        assert_eq!(matches[0].line, 12);
        assert_eq!(matches[0].content, "  image: {{ .Values.image.tag }}");
        assert_eq!(matches[1].file, "templates/_helpers.tpl");
        assert_eq!(matches[1].content, "{{- define \"x\" -}}: y");
    }

    #[test]
    fn test_parse_output_empty_and_garbage() {
        assert!(parse_output("").is_empty());
        assert!(parse_output("Binary file matches\n").is_empty());
    }

    #[test]
    fn test_detect_missing_backend() {
        let temp = TempDir::new().unwrap();
        let err = Searcher::detect_in(None, Some(temp.path().as_os_str()))
            .err()
            .unwrap();
        assert_eq!(err.kind(), "BackendMissing");

        let err = Searcher::detect_in(None, None).err().unwrap();
        assert_eq!(err.kind(), "BackendMissing");
    }

    #[test]
    fn test_detect_prefers_ripgrep() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("rg"), "").unwrap();
        std::fs::write(temp.path().join("grep"), "").unwrap();
        let path_var = temp.path().as_os_str();

        let searcher = Searcher::detect_in(None, Some(path_var)).unwrap();
        assert_eq!(searcher.backend_name(), "rg");

        let searcher = Searcher::detect_in(Some(SearchTool::Grep), Some(path_var)).unwrap();
        assert_eq!(searcher.backend_name(), "grep");
    }

    #[test]
    fn test_detect_explicit_tool_missing() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("grep"), "").unwrap();

        let err = Searcher::detect_in(Some(SearchTool::Ripgrep), Some(temp.path().as_os_str()))
            .err()
            .unwrap();
        assert!(err.to_string().contains("rg"));
    }
}
