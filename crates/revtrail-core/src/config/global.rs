//! Global (workspace-wide) audit settings.

use serde::{Deserialize, Serialize};

/// Which temporal indexing policy audit tables use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Rows carry only their creation revision
    #[default]
    Default,
    /// Rows carry a creation revision and a nullable end revision
    Validity,
}

/// Reserved column names and global switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default = "default_revision_field")]
    pub revision_field: String,
    #[serde(default = "default_revision_type_field")]
    pub revision_type_field: String,
    #[serde(default = "default_revision_end_field")]
    pub revision_end_field: String,
    #[serde(default = "default_embeddable_set_ordinal_field")]
    pub embeddable_set_ordinal_field: String,
    /// Column numbering equal members of a plain bag
    #[serde(default = "default_bag_occurrence_field")]
    pub bag_occurrence_field: String,
    /// When false, collection changes are never audited
    #[serde(default = "default_true")]
    pub generate_revisions_for_collections: bool,
}

fn default_revision_field() -> String {
    "REV".to_string()
}

fn default_revision_type_field() -> String {
    "REVTYPE".to_string()
}

fn default_revision_end_field() -> String {
    "REVEND".to_string()
}

fn default_embeddable_set_ordinal_field() -> String {
    "SETORDINAL".to_string()
}

fn default_bag_occurrence_field() -> String {
    "OCCURRENCE".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            revision_field: default_revision_field(),
            revision_type_field: default_revision_type_field(),
            revision_end_field: default_revision_end_field(),
            embeddable_set_ordinal_field: default_embeddable_set_ordinal_field(),
            bag_occurrence_field: default_bag_occurrence_field(),
            generate_revisions_for_collections: true,
        }
    }
}

impl GlobalConfig {
    /// Default settings with the given strategy
    pub fn with_strategy(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }
}
