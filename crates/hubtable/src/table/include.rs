//! Column-pruned GraphQL variables.
//!
//! Each table declares which optional sub-selections of its query document
//! serve which columns. Before the first request of a list call the
//! requested columns are turned into `include*` booleans that are bound as
//! GraphQL variables, so `@include(if: $flag)` drops everything the caller
//! did not ask for.

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

use super::context::QueryContext;

/// One include flag and the columns that need it.
#[derive(Debug, Clone, Copy)]
pub struct ColumnFlag {
    pub flag: &'static str,
    pub columns: &'static [&'static str],
}

impl ColumnFlag {
    pub const fn new(flag: &'static str, columns: &'static [&'static str]) -> Self {
        Self { flag, columns }
    }
}

/// Computed include flags for one list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludeFlags(BTreeMap<&'static str, bool>);

impl IncludeFlags {
    pub fn get(&self, flag: &str) -> bool {
        self.0.get(flag).copied().unwrap_or(false)
    }

    /// Switch a flag off regardless of the requested columns.
    pub fn force_off(&mut self, flag: &'static str) {
        if let Some(value) = self.0.get_mut(flag) {
            *value = false;
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().filter(|(_, on)| **on).map(|(flag, _)| *flag)
    }

    /// True if every flag enabled here is also enabled in `other`.
    pub fn is_subset_of(&self, other: &IncludeFlags) -> bool {
        self.enabled().all(|flag| other.get(flag))
    }

    /// Bind every flag (enabled or not) into a GraphQL variables object.
    pub fn write_variables(&self, variables: &mut Map<String, Json>) {
        for (flag, on) in &self.0 {
            variables.insert((*flag).to_string(), Json::Bool(*on));
        }
    }
}

/// A flag is on iff at least one of its columns was requested.
pub fn include_flags(mapping: &[ColumnFlag], ctx: &QueryContext) -> IncludeFlags {
    let flags = mapping
        .iter()
        .map(|entry| {
            let on = entry.columns.iter().any(|column| ctx.is_requested(column));
            (entry.flag, on)
        })
        .fold(BTreeMap::new(), |mut acc, (flag, on)| {
            // A flag listed twice is on if either entry turns it on.
            *acc.entry(flag).or_insert(false) |= on;
            acc
        });

    IncludeFlags(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &[ColumnFlag] = &[
        ColumnFlag::new(
            "includeViewerPermissions",
            &["your_permission", "can_administer", "can_update_topics"],
        ),
        ColumnFlag::new("includeLicense", &["license_spdx_id", "license_name"]),
        ColumnFlag::new("includeTopics", &["topics"]),
        ColumnFlag::new("includeTopics", &["topic_count"]),
    ];

    fn flags_for(columns: &[&str]) -> IncludeFlags {
        include_flags(
            MAPPING,
            &QueryContext::new().with_columns(columns.iter().copied()),
        )
    }

    #[test]
    fn test_unrequested_permission_columns_disable_the_flag() {
        let flags = flags_for(&["name"]);
        assert!(!flags.get("includeViewerPermissions"));
        assert!(!flags.get("includeLicense"));
        assert!(!flags.get("includeTopics"));
        assert_eq!(flags.enabled().count(), 0);
    }

    #[test]
    fn test_any_column_of_a_group_enables_the_shared_flag() {
        let flags = flags_for(&["name", "can_administer"]);
        assert!(flags.get("includeViewerPermissions"));
        assert!(!flags.get("includeLicense"));

        let flags = flags_for(&["topic_count"]);
        assert!(flags.get("includeTopics"));
    }

    #[test]
    fn test_empty_column_set_enables_everything() {
        let flags = flags_for(&[]);
        assert_eq!(flags.enabled().count(), 3);
    }

    #[test]
    fn test_flags_are_monotonic_in_requested_columns() {
        let all = [
            "name",
            "your_permission",
            "license_name",
            "topics",
            "topic_count",
        ];
        // Every prefix is a subset of every longer prefix.
        for small in 1..=all.len() {
            for large in small..=all.len() {
                let c1 = flags_for(&all[..small]);
                let c2 = flags_for(&all[..large]);
                assert!(c1.is_subset_of(&c2), "{:?} not within {:?}", c1, c2);
            }
        }
    }

    #[test]
    fn test_force_off_and_write_variables() {
        let mut flags = flags_for(&["your_permission", "topics"]);
        flags.force_off("includeTopics");
        flags.force_off("notAFlag");

        let mut vars = Map::new();
        flags.write_variables(&mut vars);
        assert_eq!(vars.get("includeViewerPermissions"), Some(&Json::Bool(true)));
        assert_eq!(vars.get("includeTopics"), Some(&Json::Bool(false)));
        assert_eq!(vars.get("includeLicense"), Some(&Json::Bool(false)));
        assert!(!vars.contains_key("notAFlag"));
    }
}
