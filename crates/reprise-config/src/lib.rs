// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// File merged on top of the defaults when present in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "reprise.toml";

/// Where a service redirects the browser after the user authorizes the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthCallbackConfig {
    pub host: String,
    pub port: u16,
    pub callback_path: String,
}

impl OAuthCallbackConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.callback_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub oauth: OAuthCallbackConfig,
    pub token_cache_path: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: "https://api.spotify.com/v1".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
            oauth: OAuthCallbackConfig {
                host: "127.0.0.1".to_string(),
                port: 8888,
                callback_path: "/spotify/callback".to_string(),
            },
            token_cache_path: ".spotify_token.cache".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeezerConfig {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub api_base_url: String,
    pub connect_base_url: String,
    pub oauth: OAuthCallbackConfig,
    pub token_cache_path: String,
    /// Fixed wait after the API reports an exceeded quota.
    pub quota_backoff_secs: u64,
    /// Retries allowed for a single query before giving up on it.
    pub max_quota_retries: u32,
    pub min_request_interval_ms: u64,
}

impl Default for DeezerConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            api_base_url: "https://api.deezer.com".to_string(),
            connect_base_url: "https://connect.deezer.com".to_string(),
            oauth: OAuthCallbackConfig {
                host: "127.0.0.1".to_string(),
                port: 8889,
                callback_path: "/deezer/callback".to_string(),
            },
            token_cache_path: ".deezer_token.cache".to_string(),
            quota_backoff_secs: 3,
            max_quota_retries: 20,
            min_request_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Number of favorites to reconcile, `-1` for the whole library.
    pub result_limit: i64,
    pub page_size: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            result_limit: -1,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_file: String,
    pub console: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: ".reprise_logs.txt".to_string(),
            console: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub callback_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            callback_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub deezer: DeezerConfig,
    pub reconciliation: ReconciliationConfig,
    pub telemetry: TelemetryConfig,
    pub http: HttpConfig,
}

fn figment(config_path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment.merge(Env::prefixed("REPRISE_").split("__"))
}

/// Load configuration from defaults, optional TOML file, and environment
/// overrides (prefix: REPRISE_).
///
/// Runs before logging is installed, so it logs nothing itself.
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    Ok(figment(config_path).extract()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.reconciliation.result_limit, -1);
        assert_eq!(config.reconciliation.page_size, 20);
        assert_eq!(config.deezer.quota_backoff_secs, 3);
        assert_eq!(config.deezer.token_cache_path, ".deezer_token.cache");
        assert_eq!(config.telemetry.log_file, ".reprise_logs.txt");
        assert!(config.spotify.client_id.is_none());
    }

    #[test]
    fn redirect_uri_joins_host_port_and_path() {
        let oauth = DeezerConfig::default().oauth;
        assert_eq!(oauth.redirect_uri(), "http://127.0.0.1:8889/deezer/callback");
        assert_eq!(oauth.bind_address(), "127.0.0.1:8889");
    }

    #[test]
    fn toml_file_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "reprise.toml",
                r#"
                [reconciliation]
                result_limit = 10

                [deezer]
                app_id = "12345"
                "#,
            )?;
            jail.set_env("REPRISE_RECONCILIATION__PAGE_SIZE", "5");
            jail.set_env("REPRISE_TELEMETRY__CONSOLE", "false");

            let config: AppConfig = figment(Some(Path::new("reprise.toml"))).extract()?;
            assert_eq!(config.reconciliation.result_limit, 10);
            assert_eq!(config.reconciliation.page_size, 5);
            assert_eq!(config.deezer.app_id.as_deref(), Some("12345"));
            assert!(!config.telemetry.console);
            assert_eq!(config.deezer.max_quota_retries, 20);
            Ok(())
        });
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        Jail::expect_with(|_jail| {
            let config: AppConfig = figment(Some(Path::new("absent.toml"))).extract()?;
            assert_eq!(config.http.timeout_secs, 30);
            Ok(())
        });
    }
}
