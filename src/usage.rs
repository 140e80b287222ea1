//! Per-key usage records.

use serde::{Deserialize, Serialize};

/// How a key was found to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageType {
    /// The full dotted key appears literally in a template.
    Direct,
    /// A registered pattern consumes the key or one of its ancestors.
    Pattern,
    Unused,
}

impl UsageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageType::Direct => "direct",
            UsageType::Pattern => "pattern",
            UsageType::Unused => "unused",
        }
    }
}

impl std::fmt::Display for UsageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A template line that uses a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    /// Name of the matching pattern, `direct` for literal hits.
    pub pattern: String,
}

/// Usage record for one key. Field order is the JSON field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyUsage {
    pub key: String,
    pub is_used: bool,
    pub usage_type: UsageType,
    /// Pattern that classified the key; empty unless `usage_type` is `Pattern`.
    pub pattern_name: String,
    /// Roll-up this leaf was folded into; empty when there is none.
    pub parent_key: String,
    /// Leaves folded into this record; non-empty only for roll-ups.
    pub child_keys: Vec<String>,
    pub locations: Vec<Location>,
}

impl KeyUsage {
    pub fn direct(key: &str, locations: Vec<Location>) -> Self {
        debug_assert!(!locations.is_empty());
        Self::used(key, UsageType::Direct, String::new(), locations)
    }

    pub fn pattern(key: &str, pattern_name: &str, locations: Vec<Location>) -> Self {
        debug_assert!(!locations.is_empty());
        Self::used(key, UsageType::Pattern, pattern_name.to_string(), locations)
    }

    pub fn unused(key: &str) -> Self {
        Self {
            key: key.to_string(),
            is_used: false,
            usage_type: UsageType::Unused,
            pattern_name: String::new(),
            parent_key: String::new(),
            child_keys: Vec::new(),
            locations: Vec::new(),
        }
    }

    fn used(
        key: &str,
        usage_type: UsageType,
        pattern_name: String,
        locations: Vec<Location>,
    ) -> Self {
        Self {
            key: key.to_string(),
            is_used: true,
            usage_type,
            pattern_name,
            parent_key: String::new(),
            child_keys: Vec::new(),
            locations,
        }
    }

    /// Whether this record aggregates child keys.
    pub fn is_rollup(&self) -> bool {
        !self.child_keys.is_empty()
    }
}
