//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive (configparser lowercases them).

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::PipelineError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| PipelineError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, PipelineError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| PipelineError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    /// Adapter with no sections; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { config: Ini::new() }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn section_keys(&self, section: &str) -> Vec<String> {
        self.config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|keys| keys.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[data]
dir = /srv/coinsignal

[market]
vs_currency = usd
top_n = 25
throttle_ms = 500

[model]
n_estimators = 50
seed = 7

[network_fees]
BTC = 4.5
sol = 0.01

[pipeline]
workers = 4
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("data", "dir"), Some("/srv/coinsignal".to_string()));
        assert_eq!(adapter.get_int("market", "top_n", 50), 25);
        assert_eq!(adapter.get_int("model", "seed", 42), 7);
    }

    #[test]
    fn missing_values_fall_back() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("market", "api_key"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("model", "max_depth", 0), 0);
        assert_eq!(adapter.get_double("simulation", "investment", 1000.0), 1000.0);
    }

    #[test]
    fn non_numeric_values_fall_back() {
        let adapter = FileConfigAdapter::from_string("[model]\nseed = abc\n").unwrap();
        assert_eq!(adapter.get_int("model", "seed", 42), 42);
        assert_eq!(adapter.get_double("model", "seed", 1.5), 1.5);
    }

    #[test]
    fn section_keys_are_lowercased() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        let mut keys = adapter.section_keys("network_fees");
        keys.sort();
        assert_eq!(keys, vec!["btc", "sol"]);
        assert_eq!(adapter.get_double("network_fees", "BTC", 0.0), 4.5);
        assert!(adapter.section_keys("absent").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[simulation]\ninvestment = 2500\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_double("simulation", "investment", 0.0), 2500.0);
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/coinsignal.ini").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse { .. }));
    }

    #[test]
    fn empty_adapter_uses_defaults() {
        let adapter = FileConfigAdapter::empty();
        assert_eq!(adapter.get_int("market", "top_n", 50), 50);
        assert!(adapter.section_keys("network_fees").is_empty());
    }
}
