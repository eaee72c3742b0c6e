use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

use crate::zoho::cache::DEFAULT_TTL_SECS;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub zoho: ZohoConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub http: HttpConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

/// Zoho data center environment
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Production,
  Sandbox,
}

impl Environment {
  /// API root, without the organization segment
  pub fn api_root(self) -> &'static str {
    match self {
      Self::Production => "https://creator.zoho.com/api/v2",
      Self::Sandbox => "https://creatorsandbox.zoho.com/api/v2",
    }
  }
}

impl FromStr for Environment {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "production" => Ok(Self::Production),
      "sandbox" => Ok(Self::Sandbox),
      other => Err(eyre!(
        "Unknown Zoho environment '{}'. Use 'production' or 'sandbox'.",
        other
      )),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZohoConfig {
  #[serde(default)]
  pub environment: Environment,
  pub organization_id: Option<String>,
  pub client_id: Option<String>,
  /// Full API base URL. Overrides environment + organization_id when set.
  pub base_url: Option<String>,
  #[serde(default = "default_accounts_url")]
  pub accounts_url: String,
}

impl Default for ZohoConfig {
  fn default() -> Self {
    Self {
      environment: Environment::default(),
      organization_id: None,
      client_id: None,
      base_url: None,
      accounts_url: default_accounts_url(),
    }
  }
}

fn default_accounts_url() -> String {
  "https://accounts.zoho.com".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Form metadata time-to-live in seconds
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
    }
  }
}

fn default_ttl_secs() -> u64 {
  DEFAULT_TTL_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
  #[default]
  Text,
  Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Filter directive used when RUST_LOG is unset
  #[serde(default = "default_log_level")]
  pub level: String,
  #[serde(default)]
  pub format: LogFormat,
  /// Write daily-rotated log files here instead of stderr
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      format: LogFormat::default(),
      directory: None,
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./zoho-mcp.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/zoho-mcp/config.yaml
  ///
  /// The file is optional; environment variables are applied on top of
  /// whatever was found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.apply_env_overrides(|key| std::env::var(key).ok())?;

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("zoho-mcp.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("zoho-mcp").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Apply ZOHO_ENVIRONMENT, ZOHO_ORGANIZATION_ID and ZOHO_CLIENT_ID.
  fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
  where
    F: Fn(&str) -> Option<String>,
  {
    if let Some(env) = lookup("ZOHO_ENVIRONMENT") {
      self.zoho.environment = env.parse()?;
    }
    if let Some(org) = lookup("ZOHO_ORGANIZATION_ID") {
      self.zoho.organization_id = Some(org);
    }
    if let Some(client_id) = lookup("ZOHO_CLIENT_ID") {
      self.zoho.client_id = Some(client_id);
    }
    Ok(())
  }

  /// Resolve the API base URL the client sends every request under.
  pub fn api_base_url(&self) -> Result<Url> {
    let raw = match (&self.zoho.base_url, &self.zoho.organization_id) {
      (Some(base_url), _) => base_url.clone(),
      (None, Some(org)) => format!("{}/{}", self.zoho.environment.api_root(), org),
      (None, None) => {
        return Err(eyre!(
          "Zoho organization not configured. Set zoho.organization_id or ZOHO_ORGANIZATION_ID."
        ))
      }
    };

    Url::parse(&raw).map_err(|e| eyre!("Invalid Zoho API URL '{}': {}", raw, e))
  }

  pub fn accounts_url(&self) -> Result<Url> {
    Url::parse(&self.zoho.accounts_url)
      .map_err(|e| eyre!("Invalid Zoho accounts URL '{}': {}", self.zoho.accounts_url, e))
  }

  pub fn client_id(&self) -> Result<String> {
    self
      .zoho
      .client_id
      .clone()
      .ok_or_else(|| eyre!("Zoho client id not configured. Set zoho.client_id or ZOHO_CLIENT_ID."))
  }

  /// Get the OAuth client secret from ZOHO_CLIENT_SECRET.
  pub fn get_client_secret() -> Result<String> {
    std::env::var("ZOHO_CLIENT_SECRET").map_err(|_| {
      eyre!("Zoho client secret not found. Set ZOHO_CLIENT_SECRET environment variable.")
    })
  }

  /// Get the OAuth refresh token from ZOHO_REFRESH_TOKEN.
  pub fn get_refresh_token() -> Result<String> {
    std::env::var("ZOHO_REFRESH_TOKEN").map_err(|_| {
      eyre!("Zoho refresh token not found. Set ZOHO_REFRESH_TOKEN environment variable.")
    })
  }

  /// A pre-issued access token. When set, no refresh flow is used.
  pub fn get_access_token() -> Option<String> {
    std::env::var("ZOHO_ACCESS_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::io::Write;

  #[test]
  fn test_defaults_without_file() {
    let config = Config::default();
    assert_eq!(config.zoho.environment, Environment::Production);
    assert_eq!(config.cache.ttl_secs, 300);
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
    assert_eq!(config.zoho.accounts_url, "https://accounts.zoho.com");
  }

  #[test]
  fn test_parse_partial_yaml() {
    let yaml = r#"
zoho:
  environment: sandbox
  organization_id: acme
cache:
  ttl_secs: 60
logging:
  format: json
  directory: /var/log/zoho-mcp
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.zoho.environment, Environment::Sandbox);
    assert_eq!(config.zoho.organization_id.as_deref(), Some("acme"));
    assert_eq!(config.zoho.accounts_url, "https://accounts.zoho.com");
    assert_eq!(config.cache.ttl_secs, 60);
    assert_eq!(config.http.timeout_secs, 30);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(
      config.logging.directory,
      Some(PathBuf::from("/var/log/zoho-mcp"))
    );
  }

  #[test]
  fn test_env_overrides() {
    let vars: HashMap<&str, &str> = [
      ("ZOHO_ENVIRONMENT", "Sandbox"),
      ("ZOHO_ORGANIZATION_ID", "org-1"),
      ("ZOHO_CLIENT_ID", "cid"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config
      .apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
      .unwrap();

    assert_eq!(config.zoho.environment, Environment::Sandbox);
    assert_eq!(config.zoho.organization_id.as_deref(), Some("org-1"));
    assert_eq!(config.client_id().unwrap(), "cid");
  }

  #[test]
  fn test_unknown_environment_is_rejected() {
    let mut config = Config::default();
    let result = config.apply_env_overrides(|k| (k == "ZOHO_ENVIRONMENT").then(|| "staging".to_string()));
    assert!(result.is_err());
  }

  #[test]
  fn test_api_base_url_from_environment_and_org() {
    let mut config = Config::default();
    config.zoho.organization_id = Some("acme".to_string());
    assert_eq!(
      config.api_base_url().unwrap().as_str(),
      "https://creator.zoho.com/api/v2/acme"
    );

    config.zoho.environment = Environment::Sandbox;
    assert_eq!(
      config.api_base_url().unwrap().as_str(),
      "https://creatorsandbox.zoho.com/api/v2/acme"
    );
  }

  #[test]
  fn test_api_base_url_override_wins() {
    let mut config = Config::default();
    config.zoho.organization_id = Some("acme".to_string());
    config.zoho.base_url = Some("http://localhost:8080/api/v2/test".to_string());
    assert_eq!(
      config.api_base_url().unwrap().as_str(),
      "http://localhost:8080/api/v2/test"
    );
  }

  #[test]
  fn test_api_base_url_requires_organization() {
    let config = Config::default();
    assert!(config.api_base_url().is_err());
    assert!(config.client_id().is_err());
  }

  #[test]
  fn test_load_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "zoho:\n  organization_id: from-file\nhttp:\n  timeout_secs: 5").unwrap();

    let config = Config::load_from_path(file.path()).unwrap();
    assert_eq!(config.zoho.organization_id.as_deref(), Some("from-file"));
    assert_eq!(config.http.timeout_secs, 5);
  }

  #[test]
  fn test_load_missing_explicit_path_fails() {
    let result = Config::load(Some(Path::new("/nonexistent/zoho-mcp.yaml")));
    assert!(result.is_err());
  }
}
