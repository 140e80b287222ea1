//! ripgrep backend.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{run_tool, FileLineMatch, Query, SearchBackend};
use crate::error::AnalyzerError;

pub struct Ripgrep {
    binary: PathBuf,
}

impl Ripgrep {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn command(&self, query: Query<'_>, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "--no-config",
            // read the same files as `grep -r`
            "--no-ignore",
            "--hidden",
            "--no-heading",
            "--with-filename",
            "--line-number",
            "--color",
            "never",
        ]);
        match query {
            Query::Literal(text) => {
                cmd.args(["--fixed-strings", "-e", text]);
            }
            Query::Pattern(pattern) => match pattern.scratch_path() {
                Some(file) => {
                    cmd.arg("-f").arg(file);
                }
                None => {
                    cmd.args(["-e", pattern.source()]);
                }
            },
        }
        cmd.arg("--").arg(dir);
        cmd
    }
}

impl SearchBackend for Ripgrep {
    fn name(&self) -> &'static str {
        "rg"
    }

    fn search(&self, query: Query<'_>, dir: &Path) -> Result<Vec<FileLineMatch>, AnalyzerError> {
        run_tool(self.command(query, dir), "rg")
    }
}
