//! Location of the persisted credentials.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

const CREDENTIALS_FILE: &str = "credentials.json";

/// Resolve the credential file, preferring an explicit path.
pub fn credentials_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let dirs = ProjectDirs::from("", "", "rim").context("Could not determine data directory")?;
    Ok(dirs.data_dir().join(CREDENTIALS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = credentials_path(Some(Path::new("/tmp/rim/creds.json"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/rim/creds.json"));
    }

    #[test]
    fn default_path_names_the_credentials_file() {
        if let Ok(path) = credentials_path(None) {
            assert!(path.ends_with(CREDENTIALS_FILE));
        }
    }
}
