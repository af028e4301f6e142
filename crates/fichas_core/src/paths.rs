use std::path::PathBuf;

/// Data directory (~/.gestor-fichas)
pub fn fichas_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(".gestor-fichas")
}

/// config.json path
pub fn config_json_path() -> PathBuf {
    fichas_dir().join("config.json")
}

/// Admin token file, the counterpart of the browser's local storage entry
pub fn admin_token_path() -> PathBuf {
    fichas_dir().join("admin_token.json")
}
