//! Manager settings

use serde::{Deserialize, Serialize};

/// Behaviour switches of a [`crate::CommandManager`], loadable from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ManagerSettings {
    /// Match literals ignoring ASCII case
    pub case_insensitive_literals: bool,
    /// Replace a command registered again for the same path and sender type
    pub override_existing_commands: bool,
    /// Keep accepting registrations after the manager was locked
    pub allow_unsafe_registration: bool,
    /// Return a single empty suggestion instead of none
    pub force_suggestion: bool,
    /// Upper bound on returned suggestions
    pub max_suggestions: Option<usize>,
}

impl ManagerSettings {
    /// Parse settings from TOML; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
