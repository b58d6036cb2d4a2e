use std::path::PathBuf;

use tracing::warn;

/// Relative directory used when the platform has no notion of a cache directory.
pub const FALLBACK_CACHE_DIR: &str = "cache";

pub fn get_project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "hashplay", "hashplay")
}

/// Where chain hashes are kept unless the caller picks a location.
pub fn default_cache_dir() -> PathBuf {
    match get_project_dirs() {
        Some(dirs) => dirs.cache_dir().join("chains"),
        None => {
            warn!(
                fallback = FALLBACK_CACHE_DIR,
                "cannot determine platform cache directory"
            );
            PathBuf::from(FALLBACK_CACHE_DIR)
        }
    }
}
