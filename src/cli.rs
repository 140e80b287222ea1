//! Command-line interface for unused-values.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::analyzer::Analyzer;
use crate::config::{discover_config, Config, ConfigFile, SearchTool};
use crate::display::{Display, DisplayOptions, Style};
use crate::error::AnalyzerError;
use crate::finder::CancelToken;
use crate::patterns::PatternRegistry;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Find Helm chart values that no template references.
///
/// Every leaf key of the values file is searched for in the templates
/// directory, first as a literal dotted path, then through a set of patterns
/// that consume whole subtrees (toYaml, with, include helpers).
#[derive(Parser)]
#[command(name = "unused-values")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report values keys that no template uses
    #[command(visible_alias = "check")]
    Analyze(AnalyzeArgs),
    /// List the registered search patterns
    Patterns(PatternsArgs),
}

/// Arguments for the analyze command.
#[derive(Parser, Default)]
pub struct AnalyzeArgs {
    /// Chart templates directory to search
    #[arg(long, value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Values file whose keys are checked
    #[arg(long, value_name = "FILE")]
    pub values_file: Option<PathBuf>,

    /// Config file (default: unused-values.yaml or .unused-values.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only check keys containing this substring
    #[arg(long, value_name = "SUBSTR")]
    pub filter: Option<String>,

    /// Report used keys as well as unused ones
    #[arg(long)]
    pub show_all: bool,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_colors: bool,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Print debug logging to stderr
    #[arg(long)]
    pub debug: bool,

    /// Search tool (default: rg if installed, else grep)
    #[arg(long, value_enum)]
    pub search_tool: Option<SearchTool>,

    /// Shorthand for --search-tool rg
    #[arg(long)]
    pub use_ripgrep: bool,

    /// Worker count, 0 for one per CPU
    #[arg(long, value_name = "N")]
    pub parallelism: Option<usize>,

    /// Exit code to use when unused keys are found
    #[arg(long, value_name = "N")]
    pub exit_code_on_unused: Option<i32>,

    /// Hide the progress indicator
    #[arg(long)]
    pub no_progress: bool,
}

impl AnalyzeArgs {
    /// Build the run config: defaults, then the config file, then flags.
    pub fn to_config(&self) -> Result<Config, AnalyzerError> {
        let mut config = Config::default();
        if let Some(file) = load_config_file(self.config.as_ref())? {
            config = config.merge_file(file);
        }

        if let Some(dir) = &self.templates_dir {
            config.templates_dir = dir.clone();
        }
        if let Some(values) = &self.values_file {
            config.values_file = values.clone();
        }
        if self.filter.is_some() {
            config.filter_pattern = self.filter.clone();
        }
        if self.search_tool.is_some() {
            config.search_tool = self.search_tool;
        }
        if let Some(n) = self.parallelism {
            config.parallelism = n;
        }
        if let Some(code) = self.exit_code_on_unused {
            config.exit_code_on_unused = code;
        }
        config.show_all_keys = self.show_all;
        config.json_output = self.json;
        config.no_colors = self.no_colors;
        config.quiet_mode = self.quiet;
        config.debug = self.debug;
        config.use_ripgrep = self.use_ripgrep;

        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the patterns command.
#[derive(Parser)]
pub struct PatternsArgs {
    /// Config file with extra patterns
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Emit JSON instead of a list
    #[arg(long)]
    pub json: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_colors: bool,
}

fn load_config_file(explicit: Option<&PathBuf>) -> Result<Option<ConfigFile>, AnalyzerError> {
    let path = match explicit {
        Some(p) => Some(p.clone()),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| discover_config(&cwd)),
    };
    path.map(ConfigFile::parse_file).transpose()
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let config = match args.to_config() {
        Ok(c) => c,
        Err(e) => {
            let display = Display::new(DisplayOptions {
                no_colors: args.no_colors,
                quiet: args.quiet,
                debug: args.debug,
                json: args.json,
            });
            report::write_error(&display, &e, args.json);
            return Ok(EXIT_ERROR);
        }
    };

    let display = Display::new(DisplayOptions::from_config(&config));
    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone(), &display);

    display.highlight(&format!(
        "Checking {} against {}",
        config.values_file.display(),
        config.templates_dir.display()
    ));

    let analysis = match Analyzer::new(&config)
        .cancel_token(cancel)
        .show_progress(!args.no_progress)
        .run(&display)
    {
        Ok(a) => a,
        Err(e) => {
            report::write_error(&display, &e, config.json_output);
            return Ok(EXIT_ERROR);
        }
    };

    let shown = report::visible(&analysis.records, config.show_all_keys);
    if config.json_output {
        report::write_json(&display, &shown)?;
    } else {
        report::write_table(&display, &shown, &analysis.summary);
    }

    Ok(analysis.exit_code(config.exit_code_on_unused))
}

/// Cancel `token` on Ctrl-C.
///
/// Workers stop taking keys once the token is set; searches already running
/// are allowed to finish.
fn install_interrupt_handler(token: CancelToken, display: &Display) {
    let spawned = std::thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            else {
                return;
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            });
        });
    note_spawn_failure(spawned, display);
}

fn note_spawn_failure<T>(spawned: std::io::Result<T>, display: &Display) {
    if let Err(e) = spawned {
        display.debug(&format!("Ctrl-C handler not installed: {}", e));
    }
}

#[derive(Serialize)]
struct PatternEntry<'a> {
    name: &'a str,
    description: &'a str,
    regex: &'a str,
}

/// Run the patterns command.
pub fn run_patterns(args: &PatternsArgs) -> anyhow::Result<i32> {
    let display = Display::new(DisplayOptions {
        no_colors: args.no_colors,
        ..Default::default()
    });

    let registry = match build_registry(args) {
        Ok(r) => r,
        Err(e) => {
            report::write_error(&display, &e, args.json);
            return Ok(EXIT_ERROR);
        }
    };

    if args.json {
        let entries: Vec<PatternEntry> = registry
            .iter()
            .map(|p| PatternEntry {
                name: p.name(),
                description: p.description(),
                regex: p.source(),
            })
            .collect();
        let mut json = serde_json::to_string_pretty(&entries)?;
        json.push('\n');
        display.raw_json(&json);
        return Ok(EXIT_SUCCESS);
    }

    display.bold("Registered patterns (tried in this order):");
    display.info("");
    for pattern in registry.iter() {
        display.info(&format!("  {:<26} {}", pattern.name(), pattern.description()));
        display.info(&format!(
            "  {:<26} {}",
            "",
            display.paint(pattern.source(), Style::Dimmed)
        ));
    }

    Ok(EXIT_SUCCESS)
}

fn build_registry(args: &PatternsArgs) -> Result<PatternRegistry, AnalyzerError> {
    let mut registry = PatternRegistry::with_builtins()?;
    if let Some(file) = load_config_file(args.config.as_ref())? {
        registry.register_specs(&file.patterns)?;
    }
    Ok(registry)
}
