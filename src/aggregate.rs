//! Parent roll-up, run summary and exit code.

use std::collections::BTreeMap;

use crate::keys::parent_key;
use crate::usage::{KeyUsage, UsageType};

/// Fold sibling leaves into parent roll-ups.
///
/// A parent gets a roll-up record when at least two analysed leaves share it.
/// Those leaves get `parent_key` set. The result holds every leaf plus the
/// roll-ups, sorted by key.
pub fn aggregate(mut leaves: Vec<KeyUsage>) -> Vec<KeyUsage> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, usage) in leaves.iter().enumerate() {
        if let Some(parent) = parent_key(&usage.key) {
            groups.entry(parent.to_string()).or_default().push(i);
        }
    }

    let mut rollups = Vec::new();
    for (parent, members) in groups {
        if members.len() < 2 {
            continue;
        }
        for &i in &members {
            leaves[i].parent_key = parent.clone();
        }
        let children: Vec<&KeyUsage> = members.iter().map(|&i| &leaves[i]).collect();
        rollups.push(rollup(&parent, &children));
    }

    leaves.extend(rollups);
    leaves.sort_by(|a, b| a.key.cmp(&b.key));
    leaves
}

fn rollup(parent: &str, children: &[&KeyUsage]) -> KeyUsage {
    let mut child_keys: Vec<String> = children.iter().map(|c| c.key.clone()).collect();
    child_keys.sort();

    if children.iter().any(|c| !c.is_used) {
        let mut record = KeyUsage::unused(parent);
        record.child_keys = child_keys;
        return record;
    }

    let locations = children
        .iter()
        .flat_map(|c| c.locations.iter().cloned())
        .collect();
    let pattern_child = children
        .iter()
        .find(|c| c.usage_type == UsageType::Pattern);
    let mut record = match pattern_child {
        Some(child) => KeyUsage::pattern(parent, &child.pattern_name, locations),
        None => KeyUsage::direct(parent, locations),
    };
    record.child_keys = child_keys;
    record
}

/// Leaf counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub direct: usize,
    pub pattern: usize,
    pub unused: usize,
}

impl Summary {
    /// Count leaf records; roll-ups are ignored.
    pub fn from_usages(usages: &[KeyUsage]) -> Self {
        let mut summary = Summary::default();
        for usage in usages.iter().filter(|u| !u.is_rollup()) {
            summary.total += 1;
            match usage.usage_type {
                UsageType::Direct => summary.direct += 1,
                UsageType::Pattern => summary.pattern += 1,
                UsageType::Unused => summary.unused += 1,
            }
        }
        summary
    }

    /// `exit_code_on_unused` if any leaf is unused, else 0.
    pub fn exit_code(&self, exit_code_on_unused: i32) -> i32 {
        if self.unused > 0 {
            exit_code_on_unused
        } else {
            0
        }
    }
}
