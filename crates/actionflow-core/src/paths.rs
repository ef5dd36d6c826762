use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ACTIONFLOW_DIR: &str = ".actionflow";
pub const CONFIG_FILE: &str = ".actionflow/config.yaml";
pub const DEFAULT_ACTIONS_FILE: &str = "actions.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn actionflow_dir(root: &Path) -> PathBuf {
    root.join(ACTIONFLOW_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Registry files are listed in the config relative to `.actionflow/`.
pub fn action_file_path(root: &Path, file: &str) -> PathBuf {
    actionflow_dir(root).join(file)
}
