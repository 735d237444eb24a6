use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "EPISODE_SYNC_CONFIG";
pub const SETTINGS_FILE_NAME: &str = "sync_config.json";

pub fn get_settings_path(explicit: Option<&Path>) -> PathBuf {
    let local = PathBuf::from(SETTINGS_FILE_NAME);
    let local = local.exists().then_some(local);
    resolve_settings_path(
        explicit,
        env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
        local,
    )
}

/// Picks the settings file: the --config flag, then the environment variable,
/// then a `sync_config.json` already present in the working directory, then
/// the platform config directory.
fn resolve_settings_path(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    local: Option<PathBuf>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return path;
    }
    if let Some(path) = local {
        return path;
    }
    get_config_dir_path().join(SETTINGS_FILE_NAME)
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("episode-sync"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}
