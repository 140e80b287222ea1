//! Portable `grep -r` backend.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{run_tool, FileLineMatch, Query, SearchBackend};
use crate::error::AnalyzerError;

pub struct Grep {
    binary: PathBuf,
}

impl Grep {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn command(&self, query: Query<'_>, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        // -I skips binary files so output stays line-oriented
        cmd.args(["-r", "-n", "-H", "-I", "--color=never"]);
        match query {
            Query::Literal(text) => {
                cmd.args(["-F", "-e", text]);
            }
            Query::Pattern(pattern) => {
                cmd.arg("-E");
                match pattern.scratch_path() {
                    Some(file) => {
                        cmd.arg("-f").arg(file);
                    }
                    None => {
                        cmd.args(["-e", pattern.source()]);
                    }
                }
            }
        }
        cmd.arg("--").arg(dir);
        cmd
    }
}

impl SearchBackend for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn search(&self, query: Query<'_>, dir: &Path) -> Result<Vec<FileLineMatch>, AnalyzerError> {
        run_tool(self.command(query, dir), "grep")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternRegistry;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_literal_command() {
        let grep = Grep::new(PathBuf::from("/bin/grep"));
        let args = args(&grep.command(Query::Literal("foo.bar"), Path::new("templates")));
        assert_eq!(
            args,
            vec!["-r", "-n", "-H", "-I", "--color=never", "-F", "-e", "foo.bar", "--", "templates"]
        );
    }

    #[test]
    fn test_pattern_command() {
        let registry = PatternRegistry::with_builtins().unwrap();
        let pattern = registry.get("with_context").unwrap();
        let scratch = pattern.scratch_path().unwrap().to_string_lossy().to_string();

        let grep = Grep::new(PathBuf::from("grep"));
        let args = args(&grep.command(Query::Pattern(pattern), Path::new("t")));
        assert!(args.contains(&"-E".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-f" && w[1] == scratch));
    }

    #[test]
    fn test_search_real_grep() {
        let Ok(searcher) = crate::search::Searcher::detect(Some(crate::config::SearchTool::Grep))
        else {
            return;
        };
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("cm.yaml"),
            "data:\n  level: {{ .Values.log.level }}\n",
        )
        .unwrap();

        let display = crate::display::Display::with_writers(
            Default::default(),
            Box::new(std::io::sink()),
            Box::new(std::io::sink()),
        );
        let hits = searcher.search(Query::Literal("log.level"), temp.path(), &display);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line, 2);
        assert!(hits[0].file.ends_with("cm.yaml"));

        let none = searcher.search(Query::Literal("log.format"), temp.path(), &display);
        assert!(none.is_empty());
    }
}
