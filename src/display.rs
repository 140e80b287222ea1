//! Terminal output sink shared by every stage of a run.
//!
//! All human-facing output and the `[debug]` log go through a [`Display`].
//! Writes are serialised with a mutex so finder workers can log concurrently.

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Config;

/// Display toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayOptions {
    pub no_colors: bool,
    pub quiet: bool,
    pub debug: bool,
    /// Stdout carries only the JSON document; stderr is unaffected.
    pub json: bool,
}

impl DisplayOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            no_colors: config.no_colors,
            quiet: config.quiet_mode,
            debug: config.debug,
            json: config.json_output,
        }
    }
}

/// Text styles used across the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Red,
    RedBold,
    Green,
    Yellow,
    Cyan,
    Bold,
    Dimmed,
}

impl Style {
    fn apply(self, text: &str) -> ColoredString {
        match self {
            Style::Red => text.red(),
            Style::RedBold => text.red().bold(),
            Style::Green => text.green(),
            Style::Yellow => text.yellow(),
            Style::Cyan => text.cyan(),
            Style::Bold => text.bold(),
            Style::Dimmed => text.dimmed(),
        }
    }
}

type Sink = Mutex<Box<dyn Write + Send>>;

pub struct Display {
    options: DisplayOptions,
    colors: bool,
    interactive: bool,
    out: Sink,
    err: Sink,
}

impl Display {
    /// Display writing to the process stdout/stderr.
    ///
    /// Colours are off when `no_colors` is set or stdout is not a terminal.
    pub fn new(options: DisplayOptions) -> Self {
        let colors = !options.no_colors && io::stdout().is_terminal();
        if !colors {
            colored::control::set_override(false);
        }
        Self {
            options,
            colors,
            interactive: io::stderr().is_terminal(),
            out: Mutex::new(Box::new(io::stdout())),
            err: Mutex::new(Box::new(io::stderr())),
        }
    }

    /// Display writing to the given sinks. Never draws progress.
    pub fn with_writers(
        options: DisplayOptions,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            options,
            colors: !options.no_colors,
            interactive: false,
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    /// Whether informational stdout lines are suppressed.
    pub fn is_quiet(&self) -> bool {
        self.options.quiet || self.options.json
    }

    pub fn is_debug(&self) -> bool {
        self.options.debug
    }

    /// Style `text`, or return it untouched when colours are off.
    pub fn paint(&self, text: &str, style: Style) -> String {
        if self.colors {
            style.apply(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn info(&self, msg: &str) {
        if !self.is_quiet() {
            write_line(&self.out, msg);
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.is_quiet() {
            write_line(&self.out, &self.paint(&format!("✓ {}", msg), Style::Green));
        }
    }

    pub fn warning(&self, msg: &str) {
        if !self.is_quiet() {
            write_line(&self.out, &self.paint(&format!("! {}", msg), Style::Yellow));
        }
    }

    pub fn highlight(&self, msg: &str) {
        if !self.is_quiet() {
            write_line(&self.out, &self.paint(msg, Style::Cyan));
        }
    }

    pub fn bold(&self, msg: &str) {
        if !self.is_quiet() {
            write_line(&self.out, &self.paint(msg, Style::Bold));
        }
    }

    /// Always printed, even in quiet mode.
    pub fn error(&self, msg: &str) {
        write_line(&self.err, &self.paint(&format!("✗ {}", msg), Style::RedBold));
    }

    /// Error header followed by a one-line cause.
    pub fn failure(&self, header: &str, cause: &str) {
        self.error(header);
        write_line(&self.err, &format!("  {}", cause));
    }

    /// Stderr only, so JSON mode does not silence it; `--quiet` does.
    pub fn debug(&self, msg: &str) {
        if self.options.debug && !self.options.quiet {
            write_line(&self.err, &self.paint(&format!("[debug] {}", msg), Style::Dimmed));
        }
    }

    /// Write `json` to stdout exactly as given.
    pub fn raw_json(&self, json: &str) {
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(json.as_bytes());
            let _ = out.flush();
        }
    }

    /// Progress indicator, hidden unless enabled, not quiet and on a terminal.
    pub fn progress(&self, enabled: bool) -> Progress {
        let bar = if enabled && !self.is_quiet() && self.interactive {
            let bar = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
                bar.set_style(style);
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        Progress { bar }
    }
}

fn write_line(sink: &Sink, line: &str) {
    if let Ok(mut w) = sink.lock() {
        let _ = writeln!(w, "{}", line);
    }
}

/// Phase/key progress for one run.
#[derive(Clone)]
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn phase(&self, phase: &str) {
        self.bar.set_message(phase.to_string());
    }

    pub fn key(&self, done: usize, total: usize) {
        self.bar.set_message(format!("key {}/{}", done, total));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    /// Cloneable in-memory writer for capturing output.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(options: DisplayOptions) -> (Display, SharedBuf, SharedBuf) {
        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let display = Display::with_writers(options, Box::new(out.clone()), Box::new(err.clone()));
        (display, out, err)
    }

    #[test]
    fn test_quiet_only_errors_and_json() {
        let (display, out, err) = capture(DisplayOptions {
            no_colors: true,
            quiet: true,
            debug: true,
            json: false,
        });

        display.info("info");
        display.success("success");
        display.warning("warning");
        display.highlight("highlight");
        display.bold("bold");
        display.debug("debug");
        display.error("boom");
        display.raw_json("[]");

        assert_eq!(out.contents(), "[]");
        assert_eq!(err.contents(), "✗ boom\n");
    }

    #[test]
    fn test_debug_gated() {
        let (display, _, err) = capture(DisplayOptions {
            no_colors: true,
            ..Default::default()
        });
        display.debug("hidden");
        assert!(err.contents().is_empty());

        let (display, _, err) = capture(DisplayOptions {
            no_colors: true,
            debug: true,
            ..Default::default()
        });
        display.debug("shown");
        assert_eq!(err.contents(), "[debug] shown\n");
    }

    #[test]
    fn test_debug_survives_json_mode() {
        let config = Config {
            json_output: true,
            no_colors: true,
            debug: true,
            ..Default::default()
        };
        let (display, out, err) = capture(DisplayOptions::from_config(&config));
        assert!(display.is_quiet());

        display.info("table");
        display.debug("backend: grep");
        display.raw_json("[]\n");

        assert_eq!(out.contents(), "[]\n");
        assert_eq!(err.contents(), "[debug] backend: grep\n");
    }

    #[test]
    fn test_no_colors_has_no_escapes() {
        let (display, out, err) = capture(DisplayOptions {
            no_colors: true,
            ..Default::default()
        });
        display.success("ok");
        display.warning("careful");
        display.highlight("look");
        display.bold("strong");
        display.failure("ConfigInvalid", "missing --values-file");

        assert!(!out.contents().contains('\x1b'));
        assert!(!err.contents().contains('\x1b'));
        assert_eq!(display.paint("x", Style::Red), "x");
        assert!(err.contents().contains("  missing --values-file\n"));
    }

    #[test]
    fn test_raw_json_is_verbatim() {
        let (display, out, _) = capture(DisplayOptions::default());
        display.raw_json("{\"a\":1}");
        display.raw_json("\n");
        assert_eq!(out.contents(), "{\"a\":1}\n");
    }
}
