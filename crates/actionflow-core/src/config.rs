use crate::error::{ActionError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

impl ConfigWarning {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// LimitsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum nesting of action groups within one run.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

pub(crate) fn default_max_depth() -> u32 {
    16
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Registry files, relative to `.actionflow/`, merged in order.
    #[serde(default = "default_action_files")]
    pub action_files: Vec<String>,
}

fn default_version() -> u32 {
    1
}

fn default_action_files() -> Vec<String> {
    vec![paths::DEFAULT_ACTIONS_FILE.to_string()]
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            limits: LimitsConfig::default(),
            action_files: default_action_files(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ActionError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.limits.max_depth == 0 {
            warnings.push(ConfigWarning::error(
                "limits.max_depth is 0: no action list could run",
            ));
        } else if self.limits.max_depth > 64 {
            warnings.push(ConfigWarning::warning(format!(
                "limits.max_depth={} (>64 is unusual)",
                self.limits.max_depth
            )));
        }

        if self.action_files.is_empty() {
            warnings.push(ConfigWarning::warning(
                "action_files is empty: only inline actions will resolve",
            ));
        }

        let mut seen = HashSet::new();
        for file in &self.action_files {
            if !seen.insert(file.as_str()) {
                warnings.push(ConfigWarning::warning(format!(
                    "action file '{file}' is listed more than once"
                )));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
