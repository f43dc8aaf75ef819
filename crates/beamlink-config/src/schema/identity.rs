use serde::{Deserialize, Serialize};

/// Login identity settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Login name. Empty means generate one for the chosen mode.
    pub name: String,
}
