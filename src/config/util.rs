//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`
///
/// Walks up parent directories until finding `config_name`.
/// An absolute `config_name` is only checked as given.
///
/// # Example
/// ```text
/// /home/user/app/assets/js/   ← start
/// /home/user/app/humpty.toml  ← found!
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.is_file().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("assets/js");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("humpty.toml"), "").unwrap();

        let found = find_config_file(Path::new("humpty.toml"), &nested).unwrap();
        assert_eq!(found, dir.path().join("humpty.toml"));
    }

    #[test]
    fn test_find_config_file_absolute() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom.toml");

        assert_eq!(find_config_file(&config, dir.path()), None);
        fs::write(&config, "").unwrap();
        assert_eq!(find_config_file(&config, Path::new("/")), Some(config));
    }

    #[test]
    fn test_find_config_file_ignores_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("humpty.toml")).unwrap();

        let found = find_config_file(Path::new("humpty.toml"), dir.path());
        assert_ne!(found, Some(dir.path().join("humpty.toml")));
    }
}
