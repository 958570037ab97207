use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

use crate::error::Error;

/// Environment variable naming a config file, consulted when `--config` is absent.
pub const CONFIG_ENV: &str = "LIVECHECK_CONFIG";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub check: CheckConfig,
    pub api: ApiConfig,
    pub client: ClientContext,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub timeout_secs: u64,
    /// Backoff ceiling while resolving the page; 0 means no ceiling.
    pub max_sleep_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_sleep_secs: 0,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com/youtubei/v1".to_string(),
        }
    }
}

/// Synthetic client description sent with every API call.
///
/// The endpoints reject requests that do not carry a recognised client, so this
/// is pinned configuration rather than anything derived at runtime. It is
/// serialized as-is into the `context.client` object of request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct ClientContext {
    pub utc_offset_minutes: i32,
    pub client_name: String,
    pub client_version: String,
    pub hl: String,
    pub gl: String,
    pub time_zone: String,
}

impl Default for ClientContext {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 540,
            client_name: "WEB".to_string(),
            client_version: "2.20211009.11.00".to_string(),
            hl: "en".to_string(),
            gl: "JP".to_string(),
            time_zone: "Asia/Tokyo".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration, falling back to defaults when no file is found.
    ///
    /// Lookup order: the explicit `path`, then `LIVECHECK_CONFIG` (a `.env`
    /// file is honoured), then `<config dir>/livecheck/config.toml` if present.
    pub fn load(path: Option<&Path>) -> Result<Config, Error> {
        match locate(path) {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                let content = fs::read_to_string(&path)?;
                Self::from_toml(&content)
            }
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Config::default())
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Config, Error> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn api_base(&self) -> Result<Url, Error> {
        Ok(Url::parse(&self.api.base_url)?)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.check.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.client.client_version.is_empty() {
            return Err(Error::Config("client_version must not be empty".to_string()));
        }
        self.api_base()?;
        Ok(())
    }
}

fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = dotenvy::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|dir| dir.join("livecheck").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_toml() {
        let toml_content = r#"
            [check]
            timeout_secs = 120
            max_sleep_secs = 600

            [api]
            base_url = "http://127.0.0.1:8080/youtubei/v1"

            [client]
            client_version = "2.20240101.00.00"
            gl = "US"
        "#;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        write!(temp_file, "{toml_content}").expect("Failed to write to temp file");

        let config = Config::load(Some(temp_file.path())).expect("Failed to parse config");

        assert_eq!(config.check.timeout_secs, 120);
        assert_eq!(config.check.max_sleep_secs, 600);
        // Unset fields keep their defaults.
        assert_eq!(config.check.request_timeout_secs, 30);
        assert_eq!(config.api.base_url, "http://127.0.0.1:8080/youtubei/v1");
        assert_eq!(config.client.client_version, "2.20240101.00.00");
        assert_eq!(config.client.gl, "US");
        assert_eq!(config.client.hl, "en");
        assert_eq!(config.client.time_zone, "Asia/Tokyo");
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.check.timeout_secs, 300);
        assert_eq!(config.check.max_sleep_secs, 0);
        assert_eq!(config.client, ClientContext::default());
        assert_eq!(
            config.api_base().unwrap().as_str(),
            "https://www.youtube.com/youtubei/v1"
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let result = Config::load(Some(missing.as_path()));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_timeout = Config::from_toml("[check]\nrequest_timeout_secs = 0\n");
        assert!(matches!(zero_timeout, Err(Error::Config(_))));

        let bad_url = Config::from_toml("[api]\nbase_url = \"not a url\"\n");
        assert!(matches!(bad_url, Err(Error::UrlParse(_))));

        let bad_type = Config::from_toml("[check]\ntimeout_secs = \"soon\"\n");
        assert!(matches!(bad_type, Err(Error::TomlParse(_))));
    }

    #[test]
    fn test_client_context_serializes_camel_case() {
        let value = serde_json::to_value(ClientContext::default()).unwrap();
        assert_eq!(value["utcOffsetMinutes"], 540);
        assert_eq!(value["clientName"], "WEB");
        assert_eq!(value["clientVersion"], "2.20211009.11.00");
        assert_eq!(value["timeZone"], "Asia/Tokyo");
        assert_eq!(value["hl"], "en");
        assert_eq!(value["gl"], "JP");
    }
}
