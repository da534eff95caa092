//! Server configuration loaded via OrthoConfig.
//!
//! Every value can come from CLI flags, `BREWERY_*` environment variables or
//! a configuration file. Accessors fall back to the production defaults.

use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_UPSTREAM_URL: &str = "https://api.openbrewerydb.org/v1/breweries";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Configuration values for the feature server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BREWERY")]
pub struct ServerSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Breweries collection URL of the upstream directory.
    pub upstream_url: Option<String>,
    /// Per-request timeout for upstream calls, in seconds.
    pub upstream_timeout_secs: Option<u64>,
    /// `User-Agent` sent upstream.
    pub user_agent: Option<String>,
}

impl ServerSettings {
    /// Return the bind address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// Return the parsed upstream URL, falling back to the public API.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the configured URL is malformed.
    pub fn upstream_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(
            self.upstream_url
                .as_deref()
                .unwrap_or(DEFAULT_UPSTREAM_URL),
        )
    }

    /// Return the upstream timeout, falling back to thirty seconds.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(
            self.upstream_timeout_secs
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for server configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> ServerSettings {
        ServerSettings::load_from_iter([OsString::from("brewery-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env([
            ("BREWERY_BIND_ADDR", None::<String>),
            ("BREWERY_UPSTREAM_URL", None::<String>),
            ("BREWERY_UPSTREAM_TIMEOUT_SECS", None::<String>),
            ("BREWERY_USER_AGENT", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(
            settings.upstream_url().expect("default url parses").as_str(),
            DEFAULT_UPSTREAM_URL
        );
        assert_eq!(settings.upstream_timeout(), Duration::from_secs(30));
        assert!(settings.user_agent.is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("BREWERY_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            (
                "BREWERY_UPSTREAM_URL",
                Some("http://localhost:4000/breweries".to_owned()),
            ),
            ("BREWERY_UPSTREAM_TIMEOUT_SECS", Some("5".to_owned())),
            ("BREWERY_USER_AGENT", Some("tap-room/2".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr(), "127.0.0.1:9000");
        assert_eq!(
            settings.upstream_url().expect("override parses").as_str(),
            "http://localhost:4000/breweries"
        );
        assert_eq!(settings.upstream_timeout(), Duration::from_secs(5));
        assert_eq!(settings.user_agent.as_deref(), Some("tap-room/2"));
    }

    #[rstest]
    fn malformed_upstream_url_is_reported() {
        let settings = ServerSettings {
            bind_addr: None,
            upstream_url: Some("not a url".to_owned()),
            upstream_timeout_secs: None,
            user_agent: None,
        };
        assert!(settings.upstream_url().is_err());
    }
}
