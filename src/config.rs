//! Runtime options and the optional YAML config file.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AnalyzerError;

/// Config file names looked up in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["unused-values.yaml", ".unused-values.yaml"];

/// Text-search tool used to scan templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum SearchTool {
    #[serde(rename = "rg")]
    #[value(name = "rg")]
    Ripgrep,
    #[serde(rename = "grep")]
    #[value(name = "grep")]
    Grep,
}

impl SearchTool {
    pub fn binary(&self) -> &'static str {
        match self {
            SearchTool::Ripgrep => "rg",
            SearchTool::Grep => "grep",
        }
    }
}

/// A search pattern declared in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PatternSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub regex: String,
}

/// On-disk config file. Every field is optional; CLI flags win.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    #[serde(default)]
    pub values_file: Option<PathBuf>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub exit_code_on_unused: Option<i32>,
    #[serde(default)]
    pub parallelism: Option<usize>,
    #[serde(default)]
    pub search_tool: Option<SearchTool>,
    /// Glob patterns for keys that are never reported (e.g. "global.*").
    #[serde(default)]
    pub ignore_keys: Vec<String>,
    /// Extra patterns, registered after the builtins in file order.
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
}

impl ConfigFile {
    /// Parse a config file from YAML.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalyzerError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| AnalyzerError::from_read(path, e))?;
        serde_yaml::from_str(&content).map_err(|source| AnalyzerError::ParseFailed {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }
}

/// Look for a config file in `dir`.
pub fn discover_config(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Options for one analysis run.
#[derive(Debug, Clone)]
pub struct Config {
    pub templates_dir: PathBuf,
    pub values_file: PathBuf,
    pub no_colors: bool,
    pub quiet_mode: bool,
    pub debug: bool,
    pub show_all_keys: bool,
    pub json_output: bool,
    pub filter_pattern: Option<String>,
    pub exit_code_on_unused: i32,
    pub use_ripgrep: bool,
    /// `None` means auto-detect.
    pub search_tool: Option<SearchTool>,
    /// `0` means one worker per CPU.
    pub parallelism: usize,
    pub ignore_keys: Vec<String>,
    pub extra_patterns: Vec<PatternSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::new(),
            values_file: PathBuf::new(),
            no_colors: false,
            quiet_mode: false,
            debug: false,
            show_all_keys: false,
            json_output: false,
            filter_pattern: None,
            exit_code_on_unused: 0,
            use_ripgrep: false,
            search_tool: None,
            parallelism: 0,
            ignore_keys: Vec::new(),
            extra_patterns: Vec::new(),
        }
    }
}

impl Config {
    /// Apply values from a config file on top of the current ones.
    pub fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(dir) = file.templates_dir {
            self.templates_dir = dir;
        }
        if let Some(values) = file.values_file {
            self.values_file = values;
        }
        if file.filter.is_some() {
            self.filter_pattern = file.filter;
        }
        if let Some(code) = file.exit_code_on_unused {
            self.exit_code_on_unused = code;
        }
        if let Some(n) = file.parallelism {
            self.parallelism = n;
        }
        if file.search_tool.is_some() {
            self.search_tool = file.search_tool;
        }
        self.ignore_keys.extend(file.ignore_keys);
        self.extra_patterns.extend(file.patterns);
        self
    }

    /// Check required options and flag combinations.
    pub fn validate(&self) -> Result<(), AnalyzerError> {
        if self.templates_dir.as_os_str().is_empty() {
            return Err(AnalyzerError::ConfigInvalid(
                "--templates-dir is required".to_string(),
            ));
        }
        if self.values_file.as_os_str().is_empty() {
            return Err(AnalyzerError::ConfigInvalid(
                "--values-file is required".to_string(),
            ));
        }
        self.search_tool()?;
        self.ignore_matcher()?;
        Ok(())
    }

    /// The requested search tool, `None` for auto-detection.
    pub fn search_tool(&self) -> Result<Option<SearchTool>, AnalyzerError> {
        match (self.use_ripgrep, self.search_tool) {
            (true, Some(SearchTool::Grep)) => Err(AnalyzerError::ConfigInvalid(
                "--use-ripgrep conflicts with --search-tool grep".to_string(),
            )),
            (true, _) => Ok(Some(SearchTool::Ripgrep)),
            (false, tool) => Ok(tool),
        }
    }

    /// Worker count with `0` resolved to the host CPU count.
    pub fn effective_parallelism(&self) -> usize {
        if self.parallelism > 0 {
            return self.parallelism;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Compiled `ignore_keys` globs, `None` when there are none.
    pub fn ignore_matcher(&self) -> Result<Option<GlobSet>, AnalyzerError> {
        if self.ignore_keys.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_keys {
            let glob = Glob::new(pattern).map_err(|e| {
                AnalyzerError::ConfigInvalid(format!("ignore_keys glob {:?}: {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map(Some)
            .map_err(|e| AnalyzerError::ConfigInvalid(format!("ignore_keys: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.exit_code_on_unused, 0);
        assert_eq!(config.parallelism, 0);
        assert_eq!(config.search_tool().unwrap(), None);
        assert!(config.effective_parallelism() >= 1);
    }

    #[test]
    fn test_validate_requires_paths() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), "ConfigInvalid");

        let config = Config {
            templates_dir: PathBuf::from("templates"),
            values_file: PathBuf::from("values.yaml"),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_use_ripgrep_conflicts_with_grep() {
        let config = Config {
            use_ripgrep: true,
            search_tool: Some(SearchTool::Grep),
            ..Default::default()
        };
        assert!(config.search_tool().is_err());

        let config = Config {
            use_ripgrep: true,
            ..Default::default()
        };
        assert_eq!(config.search_tool().unwrap(), Some(SearchTool::Ripgrep));
    }

    #[test]
    fn test_merge_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("unused-values.yaml");
        std::fs::write(
            &path,
            r#"
templates_dir: charts/app/templates
values_file: charts/app/values.yaml
exit_code_on_unused: 4
search_tool: grep
ignore_keys:
  - "global.*"
patterns:
  - name: tpl
    description: Values passed through tpl
    regex: 'tpl\s+\.Values\.'
"#,
        )
        .unwrap();

        assert_eq!(discover_config(temp.path()), Some(path.clone()));

        let file = ConfigFile::parse_file(&path).unwrap();
        let config = Config::default().merge_file(file);
        assert_eq!(config.templates_dir, PathBuf::from("charts/app/templates"));
        assert_eq!(config.exit_code_on_unused, 4);
        assert_eq!(config.search_tool, Some(SearchTool::Grep));
        assert_eq!(config.extra_patterns.len(), 1);
        assert_eq!(config.extra_patterns[0].name, "tpl");

        let matcher = config.ignore_matcher().unwrap().unwrap();
        assert!(matcher.is_match("global.image.tag"));
        assert!(!matcher.is_match("zeebe.image.tag"));
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cfg.yaml");
        std::fs::write(&path, "templatesDir: x\n").unwrap();

        let err = ConfigFile::parse_file(&path).unwrap_err();
        assert_eq!(err.kind(), "ParseFailed");
    }

    #[test]
    fn test_unreadable_config_kinds() {
        let temp = TempDir::new().unwrap();
        let err = ConfigFile::parse_file(temp.path().join("absent.yaml")).unwrap_err();
        assert_eq!(err.kind(), "FileMissing");

        let path = temp.path().join("cfg.yaml");
        std::fs::write(&path, b"filter: \xff\xfe\n").unwrap();
        let err = ConfigFile::parse_file(&path).unwrap_err();
        assert_eq!(err.kind(), "ParseFailed");
    }

    #[test]
    fn test_bad_ignore_glob() {
        let config = Config {
            templates_dir: PathBuf::from("t"),
            values_file: PathBuf::from("v"),
            ignore_keys: vec!["a[".to_string()],
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), "ConfigInvalid");
    }
}
