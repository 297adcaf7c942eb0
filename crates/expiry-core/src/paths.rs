use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const EXPIRY_DIR: &str = ".expiry";
pub const CONFIG_FILE: &str = ".expiry/config.yaml";
pub const CLUSTER_FILE: &str = ".expiry/cluster.yaml";
pub const EXPIRING_DB_FILE: &str = ".expiry/expiring.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn expiry_dir(root: &Path) -> PathBuf {
    root.join(EXPIRY_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn cluster_path(root: &Path) -> PathBuf {
    root.join(CLUSTER_FILE)
}

pub fn expiring_db_path(root: &Path) -> PathBuf {
    root.join(EXPIRING_DB_FILE)
}
