//! Analysis pipeline: values file in, usage records out.

use crate::aggregate::{aggregate, Summary};
use crate::config::Config;
use crate::display::{Display, Progress};
use crate::error::AnalyzerError;
use crate::finder::{CancelToken, Finder};
use crate::keys::{extract_keys, filter_keys, ignore_keys};
use crate::patterns::PatternRegistry;
use crate::search::Searcher;
use crate::usage::KeyUsage;

/// Result of one run.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Leaves and roll-ups, sorted by key.
    pub records: Vec<KeyUsage>,
    pub summary: Summary,
    pub backend: &'static str,
}

impl Analysis {
    pub fn exit_code(&self, exit_code_on_unused: i32) -> i32 {
        self.summary.exit_code(exit_code_on_unused)
    }

    /// Leaf records only, i.e. one per analysed key.
    pub fn leaves(&self) -> impl Iterator<Item = &KeyUsage> {
        self.records.iter().filter(|r| !r.is_rollup())
    }
}

/// Runs the full analysis for a [`Config`].
pub struct Analyzer<'a> {
    config: &'a Config,
    cancel: CancelToken,
    show_progress: bool,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            show_progress: false,
        }
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Validate the config, pick a backend and classify every key.
    pub fn run(&self, display: &Display) -> Result<Analysis, AnalyzerError> {
        self.config.validate()?;

        let mut registry = PatternRegistry::with_builtins()?;
        registry.register_specs(&self.config.extra_patterns)?;
        let searcher = Searcher::detect(self.config.search_tool()?)?;
        display.debug(&format!(
            "search backend: {}, patterns: {}",
            searcher.backend_name(),
            registry.names().join(", ")
        ));

        let progress = display.progress(self.show_progress);
        let result = self.classify(&registry, &searcher, display, &progress);
        progress.finish();
        registry.cleanup();

        let leaves = result?;
        let summary = Summary::from_usages(&leaves);
        Ok(Analysis {
            records: aggregate(leaves),
            summary,
            backend: searcher.backend_name(),
        })
    }

    fn classify(
        &self,
        registry: &PatternRegistry,
        searcher: &Searcher,
        display: &Display,
        progress: &Progress,
    ) -> Result<Vec<KeyUsage>, AnalyzerError> {
        let mut keys = extract_keys(&self.config.values_file, display, progress)?;
        if let Some(substring) = &self.config.filter_pattern {
            keys = filter_keys(keys, substring, display);
        }
        if let Some(matcher) = self.config.ignore_matcher()? {
            keys = ignore_keys(keys, &matcher, display);
        }

        if self.cancel.is_cancelled() {
            return Err(AnalyzerError::Interrupted);
        }

        Finder::new(&self.config.templates_dir, registry, searcher, display)
            .parallelism(self.config.effective_parallelism())
            .cancel_token(self.cancel.clone())
            .find_unused(&keys, progress)
    }
}
