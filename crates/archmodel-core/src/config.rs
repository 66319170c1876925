//! Model configuration.

use serde::{Deserialize, Serialize};

use crate::model::{Cardinality, Deferrability, ReferentialAction};

/// Configuration for a [`crate::Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Parent-side cardinality given to new relationships.
    pub default_pk_cardinality: Cardinality,
    /// Child-side cardinality given to new relationships.
    pub default_fk_cardinality: Cardinality,
    /// Update rule given to new relationships.
    pub default_update_rule: ReferentialAction,
    /// Delete rule given to new relationships.
    pub default_delete_rule: ReferentialAction,
    /// Deferrability given to new relationships.
    pub default_deferrability: Deferrability,
    /// Whether tables added to the schema start with automatic key
    /// cascades enabled.
    pub magic_enabled_by_default: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_pk_cardinality: Cardinality::PARENT_DEFAULT,
            default_fk_cardinality: Cardinality::CHILD_DEFAULT,
            default_update_rule: ReferentialAction::NoAction,
            default_delete_rule: ReferentialAction::NoAction,
            default_deferrability: Deferrability::NotDeferrable,
            magic_enabled_by_default: true,
        }
    }
}

impl ModelConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default cardinalities for new relationships.
    pub fn with_default_cardinality(mut self, pk: Cardinality, fk: Cardinality) -> Self {
        self.default_pk_cardinality = pk;
        self.default_fk_cardinality = fk;
        self
    }

    /// Set the default update and delete rules for new relationships.
    pub fn with_default_rules(mut self, update: ReferentialAction, delete: ReferentialAction) -> Self {
        self.default_update_rule = update;
        self.default_delete_rule = delete;
        self
    }

    /// Set the default deferrability for new relationships.
    pub fn with_default_deferrability(mut self, deferrability: Deferrability) -> Self {
        self.default_deferrability = deferrability;
        self
    }

    /// Set whether new tables start with automatic key cascades enabled.
    pub fn with_magic_enabled_by_default(mut self, enabled: bool) -> Self {
        self.magic_enabled_by_default = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.default_pk_cardinality, Cardinality::ONE);
        assert_eq!(config.default_fk_cardinality, Cardinality::CHILD_DEFAULT);
        assert!(config.magic_enabled_by_default);
    }

    #[test]
    fn test_config_builder() {
        let config = ModelConfig::new()
            .with_default_rules(ReferentialAction::Cascade, ReferentialAction::SetNull)
            .with_default_deferrability(Deferrability::InitiallyDeferred)
            .with_magic_enabled_by_default(false);

        assert_eq!(config.default_update_rule, ReferentialAction::Cascade);
        assert_eq!(config.default_delete_rule, ReferentialAction::SetNull);
        assert_eq!(config.default_deferrability, Deferrability::InitiallyDeferred);
        assert!(!config.magic_enabled_by_default);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: ModelConfig = serde_json::from_str(
            r#"{"magic_enabled_by_default": false, "default_delete_rule": "cascade"}"#,
        )
        .unwrap();

        assert!(!config.magic_enabled_by_default);
        assert_eq!(config.default_delete_rule, ReferentialAction::Cascade);
        assert_eq!(config.default_update_rule, ReferentialAction::NoAction);
    }
}
