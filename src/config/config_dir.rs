use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use tracing::debug;

use super::error::{ConfigError, ConfigResult};

fn home_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    let path = std::env::var_os("HOME");
    #[cfg(windows)]
    let path = std::env::var_os("APPDATA");
    #[cfg(not(any(unix, windows)))]
    let path: Option<std::ffi::OsString> = None;

    path.map(PathBuf::from)
}

pub fn find_config_file(use_local: bool) -> PathBuf {
    if use_local {
        return PathBuf::from("./config.toml");
    }

    find_config_file_in(home_dir())
}

/// Per-user config location under `home`, or `./config.toml` when absent.
fn find_config_file_in(home: Option<PathBuf>) -> PathBuf {
    if let Some(mut path) = home {
        if cfg!(unix) {
            path = path.join(".config");
        }

        path = path.join(crate::APPLICATION_NAME).join("config.toml");

        if path.exists() {
            return path;
        }
    }

    PathBuf::from("./config.toml")
}

pub fn read_config(use_local: bool) -> ConfigResult<Vec<u8>> {
    read_config_from(&find_config_file(use_local))
}

fn read_config_from(filename: &Path) -> ConfigResult<Vec<u8>> {
    tracing::trace!("looking for config at: {}", filename.display());
    if !filename.exists() {
        return Err(ConfigError::ConfigNotFound);
    }

    let filename = filename.canonicalize()?;
    debug!("using {} as configuration file", filename.display());

    let mut fd = File::open(filename)?;
    let mut buf = Vec::new();
    fd.read_to_end(&mut buf)?;

    Ok(buf)
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_find_config_file_local() {
        let path = find_config_file(true);
        assert_eq!(path, PathBuf::from("./config.toml"));
    }

    #[test]
    fn test_find_config_file_in_home() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut fake_config = temp_dir.path().to_path_buf();
        if cfg!(unix) {
            fake_config = fake_config.join(".config");
        }
        let fake_config = fake_config.join(crate::APPLICATION_NAME);
        fs::create_dir_all(&fake_config).unwrap();
        let config_file = fake_config.join("config.toml");
        fs::write(&config_file, "dummy = true").unwrap();

        let path = find_config_file_in(Some(temp_dir.path().to_path_buf()));
        assert_eq!(path, config_file);
    }

    #[test]
    fn test_find_config_file_falls_back_to_cwd() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = find_config_file_in(Some(temp_dir.path().to_path_buf()));
        assert_eq!(path, PathBuf::from("./config.toml"));

        assert_eq!(find_config_file_in(None), PathBuf::from("./config.toml"));
    }

    #[test]
    fn test_read_config_success() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("config.toml");
        fs::write(&file_path, b"foo = 'bar'").unwrap();

        let result = read_config_from(&file_path);

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), b"foo = 'bar'");
    }

    #[test]
    fn test_read_config_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = read_config_from(&temp_dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound)));
    }
}
