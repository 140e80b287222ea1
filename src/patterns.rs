//! Named search patterns for values consumed indirectly.
//!
//! A template can consume a whole subtree of values without naming each leaf,
//! e.g. `toYaml .Values.podAnnotations`. Each pattern here recognises one such
//! construct. Registration order is the order patterns are tried in.

use regex::Regex;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::config::PatternSpec;
use crate::error::AnalyzerError;

/// Builtin patterns as (name, description, regex).
pub const BUILTIN_PATTERNS: &[(&str, &str, &str)] = &[
    (
        "toyaml",
        "Values rendered wholesale with toYaml",
        r"toYaml\s+\.Values\.",
    ),
    (
        "security_context",
        "Values passed to the security context renderer",
        r#"include\s+"common\.compatibility\.renderSecurityContext".*\.Values\."#,
    ),
    (
        "subChartImagePullSecrets",
        "Values passed to an image helper",
        r#"include\s+"camundaPlatform\.subChartImagePullSecrets".*\.Values\."#,
    ),
    (
        "imageByParams",
        "Values passed to an image helper",
        r#"include\s+"camundaPlatform\.imageByParams".*\.Values\."#,
    ),
    (
        "with_context",
        "Values used as a with block context",
        r"with\s+\.Values\.",
    ),
    (
        "include_context",
        "Values passed to an included template",
        r"include\s+.*\.Values\.",
    ),
];

/// A registered pattern.
#[derive(Debug)]
pub struct Pattern {
    name: String,
    description: String,
    regex: Regex,
    /// Pattern file handed to the search backend, removed on cleanup.
    scratch: Option<NamedTempFile>,
}

impl Pattern {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Path of the scratch file holding the regex, if still allocated.
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|f| f.path())
    }
}

/// Ordered set of named patterns.
#[derive(Debug, Default)]
pub struct PatternRegistry {
    patterns: Vec<Pattern>,
    index: HashMap<String, usize>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the builtin patterns.
    pub fn with_builtins() -> Result<Self, AnalyzerError> {
        let mut registry = Self::new();
        for (name, description, regex) in BUILTIN_PATTERNS {
            registry.register(name, description, regex)?;
        }
        Ok(registry)
    }

    /// Register extra patterns after the existing ones.
    pub fn register_specs(&mut self, specs: &[PatternSpec]) -> Result<(), AnalyzerError> {
        for spec in specs {
            self.register(&spec.name, &spec.description, &spec.regex)?;
        }
        Ok(())
    }

    /// Compile `regex` and append it under `name`.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        regex: &str,
    ) -> Result<(), AnalyzerError> {
        if self.index.contains_key(name) {
            return Err(AnalyzerError::ConfigInvalid(format!(
                "pattern {:?} is registered twice",
                name
            )));
        }

        let compiled = Regex::new(regex).map_err(|source| AnalyzerError::RegexCompileFailed {
            name: name.to_string(),
            source,
        })?;
        let scratch = write_scratch(name, regex)?;

        self.index.insert(name.to_string(), self.patterns.len());
        self.patterns.push(Pattern {
            name: name.to_string(),
            description: description.to_string(),
            regex: compiled,
            scratch: Some(scratch),
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.index.get(name).map(|&i| &self.patterns[i])
    }

    /// Patterns in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Remove all scratch files. Safe to call more than once.
    pub fn cleanup(&mut self) {
        for pattern in &mut self.patterns {
            pattern.scratch.take();
        }
    }
}

fn write_scratch(name: &str, regex: &str) -> Result<NamedTempFile, AnalyzerError> {
    let alloc_failed = |source| AnalyzerError::ScratchAllocFailed {
        name: name.to_string(),
        source,
    };
    let mut file = tempfile::Builder::new()
        .prefix("unused-values-")
        .suffix(".pattern")
        .tempfile()
        .map_err(alloc_failed)?;
    writeln!(file, "{}", regex).map_err(alloc_failed)?;
    file.flush().map_err(alloc_failed)?;
    Ok(file)
}
