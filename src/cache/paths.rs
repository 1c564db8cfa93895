// Cache path utilities.
// Constructs filesystem paths for the photo cache, settings and log files.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "photoframe")
}

/// Get the base cache directory (~/.cache/photoframe on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Get the config directory holding user settings.
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path to the persisted settings file.
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("settings.json"))
}

/// Path to the log file written while the terminal UI owns stdout.
pub fn log_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join("photoframe.log"))
}

/// Directory holding one header and one content file per cached photo.
pub fn photos_dir(root: &Path) -> PathBuf {
    root.join("photos")
}

/// Path to a cached photo's header (JSON, no content).
pub fn header_path(root: &Path, id: &str) -> PathBuf {
    photos_dir(root).join(format!("{}.json", id))
}

/// Path to a cached photo's binary content.
pub fn content_path(root: &Path, id: &str) -> PathBuf {
    photos_dir(root).join(format!("{}.bin", id))
}

/// Path to the auxiliary metadata table.
pub fn metadata_path(root: &Path) -> PathBuf {
    root.join("metadata.json")
}

/// Temp sibling used for atomic writes.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
