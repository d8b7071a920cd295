pub mod types;

use std::path::Path;

use crate::error::{BookingError, Result};
use types::Config;

/// Read the YAML config at `path`. A missing or blank file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(BookingError::Config(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yml::from_str(&content)?;
    tracing::debug!(path = %path.display(), base_url = %config.api.base_url, "Config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn load_config_missing_file_returns_defaults() {
        let result = load_config(Path::new("/tmp/nonexistent_hotel_config_12345.yaml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.api.request_timeout_secs, 15);
    }

    #[test]
    fn load_config_valid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            "api:\n  base_url: \"https://hotel.example.com/api\"\n  request_timeout_secs: 5\ncache:\n  max_entries: 50"
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.api.base_url, "https://hotel.example.com/api");
        assert_eq!(config.api.request_timeout_secs, 5);
        assert_eq!(config.cache.max_entries, 50);
    }

    #[test]
    fn load_config_partial_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "cache:\n  rooms_ttl_secs: 30").unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.cache.rooms_ttl_secs, 30);
        assert_eq!(config.cache.room_ttl_secs, 600);
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
    }

    #[test]
    fn load_config_empty_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp).unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.cache.max_entries, 200);
    }

    #[test]
    fn load_config_directory_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, BookingError::Config(_)));
    }

    #[test]
    fn load_config_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "{{{{invalid yaml: [[[").unwrap();
        let result = load_config(tmp.path());
        assert!(result.is_err());
    }
}
