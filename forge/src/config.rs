use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use forge_common::{
    compatibility::{CompatibilityMatrix, CompatibilityOverride},
    config::{DEFAULT_CAPABILITY_VERSION_TAG, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    crypto::Address,
    error::InvalidParam,
};

fn default_version_tag() -> String {
    DEFAULT_CAPABILITY_VERSION_TAG.to_string()
}

fn default_max_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

/// Genesis configuration of a forge. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Tag stamped on every capability instance
    #[serde(default = "default_version_tag")]
    pub capability_version_tag: String,
    /// Upper bound on one page of a listing
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Cells flipped on top of the default compatibility matrix
    pub compatibility_overrides: Vec<CompatibilityOverride>,
    /// Deployers refused by the built-in deny-list policy (none = no policy)
    pub denied_deployers: Vec<Address>,
    /// Members of the upgrade council (none = no governance)
    pub upgrade_council: Vec<Address>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            capability_version_tag: default_version_tag(),
            max_page_size: default_max_page_size(),
            compatibility_overrides: Vec::new(),
            denied_deployers: Vec::new(),
            upgrade_council: Vec::new(),
        }
    }
}

impl ForgeConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InvalidParam> {
        if self.max_page_size == 0 || self.max_page_size > MAX_PAGE_SIZE {
            return Err(InvalidParam::InvalidPageSize);
        }
        if self.capability_version_tag.trim().is_empty() {
            return Err(InvalidParam::InvalidVersion);
        }
        Ok(())
    }

    /// Default matrix with the configured overrides applied
    pub fn compatibility_matrix(&self) -> CompatibilityMatrix {
        let mut matrix = CompatibilityMatrix::default();
        matrix.apply(&self.compatibility_overrides);
        matrix
    }
}
