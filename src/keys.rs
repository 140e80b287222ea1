//! Leaf key extraction from a values document.
//!
//! A leaf is any scalar in the YAML tree. Map entries contribute their key
//! name, sequence items their decimal index, and the path is joined with `.`
//! without escaping: `image.pullSecrets.0.name`.

use globset::GlobSet;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::display::{Display, Progress};
use crate::error::AnalyzerError;

/// Read `values_file` and return its leaf key paths in ascending order.
pub fn extract_keys(
    values_file: &Path,
    display: &Display,
    progress: &Progress,
) -> Result<Vec<String>, AnalyzerError> {
    progress.phase("parsing YAML");
    let content =
        fs::read_to_string(values_file).map_err(|e| AnalyzerError::from_read(values_file, e))?;
    let mut root: Value =
        serde_yaml::from_str(&content).map_err(|source| AnalyzerError::ParseFailed {
            path: values_file.to_path_buf(),
            source: Box::new(source),
        })?;
    // `<<: *anchor` entries contribute their keys under the merging map.
    root.apply_merge().map_err(|source| AnalyzerError::ParseFailed {
        path: values_file.to_path_buf(),
        source: Box::new(source),
    })?;

    progress.phase("extracting paths");
    let keys = leaf_paths(&root);
    if keys.is_empty() {
        return Err(AnalyzerError::EmptyKeySet(values_file.to_path_buf()));
    }

    display.debug(&format!(
        "extracted {} keys from {}",
        keys.len(),
        values_file.display()
    ));
    Ok(keys)
}

/// All leaf paths of `root`, sorted and de-duplicated.
pub fn leaf_paths(root: &Value) -> Vec<String> {
    let mut keys = BTreeSet::new();
    let mut segments = Vec::new();
    collect(root, &mut segments, &mut keys);
    keys.into_iter().collect()
}

fn collect(value: &Value, segments: &mut Vec<String>, keys: &mut BTreeSet<String>) {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                segments.push(scalar_text(k));
                collect(v, segments, keys);
                segments.pop();
            }
        }
        Value::Sequence(items) => {
            for (i, v) in items.iter().enumerate() {
                segments.push(i.to_string());
                collect(v, segments, keys);
                segments.pop();
            }
        }
        Value::Tagged(tagged) => collect(&tagged.value, segments, keys),
        // A bare scalar document has no path to report.
        _ if segments.is_empty() => {}
        _ => {
            keys.insert(segments.join("."));
        }
    }
}

/// Text of a map key as it appears in the document.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Keep only keys containing `substring`.
pub fn filter_keys(keys: Vec<String>, substring: &str, display: &Display) -> Vec<String> {
    let total = keys.len();
    let kept: Vec<String> = keys
        .into_iter()
        .filter(|k| k.contains(substring))
        .collect();
    display.debug(&format!(
        "filter {:?} kept {} of {} keys",
        substring,
        kept.len(),
        total
    ));
    kept
}

/// Drop keys matching any of the ignore globs.
pub fn ignore_keys(keys: Vec<String>, ignore: &GlobSet, display: &Display) -> Vec<String> {
    let total = keys.len();
    let kept: Vec<String> = keys.into_iter().filter(|k| !ignore.is_match(k)).collect();
    display.debug(&format!(
        "ignore_keys dropped {} of {} keys",
        total - kept.len(),
        total
    ));
    kept
}

/// The key with its last segment removed, `None` for top-level keys.
pub fn parent_key(key: &str) -> Option<&str> {
    key.rfind('.').map(|i| &key[..i])
}

/// Last segment of a key.
pub fn terminal_segment(key: &str) -> &str {
    key.rsplit('.').next().unwrap_or(key)
}
