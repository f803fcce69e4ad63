use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::action::ActionsConfig;
use crate::job::{Category, ExtensionSet};
use crate::runner::RunnerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    /// Per-category overrides, keyed by category name.
    #[serde(default)]
    pub categories: HashMap<String, CategoryConfig>,
}

/// Overrides for one category.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryConfig {
    /// Accepted input extensions, replacing the built-in table.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

impl Config {
    /// Extension filter for `category`, honouring overrides.
    pub fn extension_filter(&self, category: Category) -> ExtensionSet {
        self.categories
            .get(category.as_str())
            .and_then(|c| c.extensions.as_ref())
            .map(ExtensionSet::new)
            .unwrap_or_else(|| category.default_filter())
    }
}
