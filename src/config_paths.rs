//! Purpose: Resolve which config file and PHP binary the CLI operates on.
//! Exports: `default_config_path`, `resolve_config_path`, `default_php_binary`.
//! Role: Keep flag, environment, and directory semantics in one place.
//! Invariants: `--config` beats `$WPCONF_CONFIG`, which beats `./wp-config.php`.
//! Invariants: A directory argument always means `<dir>/wp-config.php`.

use std::path::{Path, PathBuf};

pub(crate) const CONFIG_FILE_NAME: &str = "wp-config.php";

pub(crate) fn default_config_path() -> PathBuf {
    match std::env::var_os("WPCONF_CONFIG") {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(CONFIG_FILE_NAME),
    }
}

pub(crate) fn resolve_config_path(input: &Path) -> PathBuf {
    if input.is_dir() {
        return input.join(CONFIG_FILE_NAME);
    }
    input.to_path_buf()
}

/// Explicit interpreter from `$WPCONF_PHP`; `None` means search `PATH`.
pub(crate) fn default_php_binary() -> Option<PathBuf> {
    std::env::var_os("WPCONF_PHP")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_resolve_to_the_config_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            resolve_config_path(temp.path()),
            temp.path().join(CONFIG_FILE_NAME)
        );
    }

    #[test]
    fn files_resolve_to_themselves() {
        let path = Path::new("/srv/www/custom-config.php");
        assert_eq!(resolve_config_path(path), path.to_path_buf());
    }
}
