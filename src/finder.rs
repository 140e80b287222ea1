//! Classifies every key as used or unused.
//!
//! Each key goes through two passes:
//!
//! 1. **Direct**: the full dotted key is searched as a literal string.
//! 2. **Pattern**: each registered pattern is tried in order; a pattern hit
//!    counts only if the matching line references the key, i.e. it names
//!    `.Values.<key>` or `.Values.<ancestor>`, or contains the key's last
//!    segment as a whole word.
//!
//! Pattern searches do not depend on the key, so they run once per pattern
//! before the keys are dispatched to the worker pool.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::display::{Display, Progress};
use crate::error::AnalyzerError;
use crate::keys::terminal_segment;
use crate::patterns::{Pattern, PatternRegistry};
use crate::search::{FileLineMatch, Query, Searcher};
use crate::usage::{KeyUsage, Location};

/// Location pattern name for literal hits.
pub const DIRECT: &str = "direct";

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Finder<'a> {
    templates_dir: PathBuf,
    registry: &'a PatternRegistry,
    searcher: &'a Searcher,
    display: &'a Display,
    parallelism: usize,
    cancel: CancelToken,
}

impl<'a> Finder<'a> {
    pub fn new<P: AsRef<Path>>(
        templates_dir: P,
        registry: &'a PatternRegistry,
        searcher: &'a Searcher,
        display: &'a Display,
    ) -> Self {
        Self {
            templates_dir: templates_dir.as_ref().to_path_buf(),
            registry,
            searcher,
            display,
            parallelism: 1,
            cancel: CancelToken::new(),
        }
    }

    /// Number of worker threads, at least 1.
    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Classify `keys`, returning one record per key in input order.
    pub fn find_unused(
        &self,
        keys: &[String],
        progress: &Progress,
    ) -> Result<Vec<KeyUsage>, AnalyzerError> {
        self.check_templates_dir()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
            .map_err(|e| {
                AnalyzerError::ConfigInvalid(format!(
                    "cannot start {} workers: {}",
                    self.parallelism, e
                ))
            })?;
        self.display.debug(&format!(
            "classifying {} keys with {} workers using {}",
            keys.len(),
            self.parallelism,
            self.searcher.backend_name()
        ));

        let pattern_hits = pool.install(|| self.search_patterns());

        let total = keys.len();
        let done = AtomicUsize::new(0);
        let results: Vec<Option<KeyUsage>> = pool.install(|| {
            keys.par_iter()
                .map(|key| {
                    if self.cancel.is_cancelled() {
                        return None;
                    }
                    let usage = self.classify(key, &pattern_hits)?;
                    if self.cancel.is_cancelled() {
                        return None;
                    }
                    let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                    progress.key(n, total);
                    Some(usage)
                })
                .collect()
        });

        if self.cancel.is_cancelled() {
            return Err(AnalyzerError::Interrupted);
        }
        Ok(results.into_iter().flatten().collect())
    }

    fn check_templates_dir(&self) -> Result<(), AnalyzerError> {
        if !self.templates_dir.is_dir() {
            return Err(AnalyzerError::FileMissing(self.templates_dir.clone()));
        }
        let files = WalkDir::new(&self.templates_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        self.display.debug(&format!(
            "{} template files under {}",
            files,
            self.templates_dir.display()
        ));
        Ok(())
    }

    /// Run every registered pattern once, in registry order.
    fn search_patterns(&self) -> Vec<Vec<FileLineMatch>> {
        let patterns: Vec<&Pattern> = self.registry.iter().collect();
        patterns
            .par_iter()
            .map(|pattern| {
                if self.cancel.is_cancelled() {
                    return Vec::new();
                }
                let hits =
                    self.searcher
                        .search(Query::Pattern(pattern), &self.templates_dir, self.display);
                self.display.debug(&format!(
                    "pattern {} matched {} lines",
                    pattern.name(),
                    hits.len()
                ));
                hits
            })
            .collect()
    }

    /// `None` when cancelled before the key could be searched.
    fn classify(&self, key: &str, pattern_hits: &[Vec<FileLineMatch>]) -> Option<KeyUsage> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let direct = self
            .searcher
            .search(Query::Literal(key), &self.templates_dir, self.display);
        if !direct.is_empty() {
            return Some(KeyUsage::direct(key, to_locations(&direct, DIRECT)));
        }

        for (pattern, hits) in self.registry.iter().zip(pattern_hits) {
            let matching: Vec<FileLineMatch> = hits
                .iter()
                .filter(|m| references_key(&m.content, key))
                .cloned()
                .collect();
            if !matching.is_empty() {
                return Some(KeyUsage::pattern(
                    key,
                    pattern.name(),
                    to_locations(&matching, pattern.name()),
                ));
            }
        }

        Some(KeyUsage::unused(key))
    }
}

fn to_locations(matches: &[FileLineMatch], pattern: &str) -> Vec<Location> {
    matches
        .iter()
        .map(|m| Location {
            file: m.file.clone(),
            line: m.line,
            pattern: pattern.to_string(),
        })
        .collect()
}

/// Whether a template line plausibly consumes `key`.
pub fn references_key(line: &str, key: &str) -> bool {
    let segments: Vec<&str> = key.split('.').collect();
    let names_path = (1..=segments.len()).any(|end| {
        let needle = format!(".Values.{}", segments[..end].join("."));
        line.match_indices(&needle).any(|(start, _)| {
            // `.Values.foo.bar` does not consume all of `foo`
            let after = line[start + needle.len()..].chars().next();
            !after.is_some_and(|c| is_ident_char(c) || c == '.')
        })
    });
    if names_path {
        return true;
    }

    // Array indices show up everywhere, so they never count as a word hit.
    let terminal = terminal_segment(key);
    !terminal.is_empty()
        && !terminal.chars().all(|c| c.is_ascii_digit())
        && contains_word(line, terminal)
}

fn contains_word(line: &str, word: &str) -> bool {
    line.match_indices(word).any(|(start, _)| {
        let before = line[..start].chars().next_back();
        let after = line[start + word.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
