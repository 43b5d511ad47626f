//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use jh_core::aggregate::DEFAULT_MAX_ISSUES;
use jh_core::{AggregateOptions, FailurePolicy};

/// Application configuration.
///
/// Layered from built-in defaults, the user config file, an explicit
/// `--config` file, and finally environment variables.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Jira base URL (`JIRA_URL`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Jira personal access token (`JIRA_PERSONAL_ACCESS_TOKEN`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_access_token: Option<String>,

    /// Directory export files are written to.
    pub output_dir: PathBuf,

    /// Maximum number of issues fetched per project.
    pub max_issues: usize,

    /// Number of changelogs fetched in parallel.
    pub concurrency: usize,

    /// Timeout of a single Jira request, in seconds.
    pub request_timeout_secs: u64,

    /// Timeout of a whole fetch run, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_timeout_secs: Option<u64>,

    /// Abort a run on the first changelog that cannot be fetched.
    pub fail_fast: bool,

    /// Listen address of `jh serve`.
    pub bind: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field(
                "personal_access_token",
                &self.personal_access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("output_dir", &self.output_dir)
            .field("max_issues", &self.max_issues)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("run_timeout_secs", &self.run_timeout_secs)
            .field("fail_fast", &self.fail_fast)
            .field("bind", &self.bind)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: None,
            personal_access_token: None,
            output_dir: PathBuf::from("."),
            max_issues: DEFAULT_MAX_ISSUES,
            concurrency: 1,
            request_timeout_secs: 30,
            run_timeout_secs: None,
            fail_fast: false,
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // JIRA_URL and JIRA_PERSONAL_ACCESS_TOKEN, then JH_* for the rest
        figment = figment
            .merge(Env::prefixed("JIRA_"))
            .merge(Env::prefixed("JH_"));

        figment.extract()
    }

    /// Returns the Jira URL and access token.
    ///
    /// # Errors
    ///
    /// Fails naming the missing environment variable if either is unset or
    /// blank.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let Some(url) = non_blank(self.url.as_deref()) else {
            bail!("JIRA_URL is not set (set it in the environment or as `url` in the config file)");
        };
        let Some(token) = non_blank(self.personal_access_token.as_deref()) else {
            bail!(
                "JIRA_PERSONAL_ACCESS_TOKEN is not set (set it in the environment or as `personal_access_token` in the config file)"
            );
        };
        Ok((url, token))
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }

    /// Aggregation options without a deadline; the deadline is fixed when
    /// a run starts.
    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            max_issues: self.max_issues,
            concurrency: self.concurrency.max(1),
            failure_policy: if self.fail_fast {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Collect
            },
            deadline: None,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Returns the platform-specific config directory for jh.
///
/// On Linux: `~/.config/jira-history`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("jira-history"))
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.max_issues, 100);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.run_timeout(), None);
        assert_eq!(config.bind, "127.0.0.1:5000");
        assert_eq!(
            config.aggregate_options().failure_policy,
            FailurePolicy::Collect
        );
    }

    #[test]
    fn test_dirs_config_path_ends_with_app_name() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "jira-history");
    }

    #[test]
    fn environment_supplies_credentials() {
        Jail::expect_with(|jail| {
            let home = jail.directory().to_path_buf();
            jail.set_env("XDG_CONFIG_HOME", home.display());
            jail.set_env("JIRA_URL", "https://jira.example.com");
            jail.set_env("JIRA_PERSONAL_ACCESS_TOKEN", "pat-abc123");
            jail.set_env("JH_CONCURRENCY", "4");
            jail.set_env("JH_FAIL_FAST", "true");

            let config = Config::load().unwrap();

            assert_eq!(
                config.credentials().unwrap(),
                ("https://jira.example.com", "pat-abc123")
            );
            assert_eq!(config.concurrency, 4);
            assert_eq!(config.aggregate_options().failure_policy, FailurePolicy::Abort);
            Ok(())
        });
    }

    #[test]
    fn config_file_is_overridden_by_environment() {
        Jail::expect_with(|jail| {
            let home = jail.directory().to_path_buf();
            jail.set_env("XDG_CONFIG_HOME", home.display());
            jail.create_file(
                "jh.toml",
                r#"
                url = "https://file.example.com"
                personal_access_token = "from-file"
                output_dir = "exports"
                max_issues = 20
                run_timeout_secs = 600
                "#,
            )?;
            jail.set_env("JH_MAX_ISSUES", "7");

            let config = Config::load_from(Some(Path::new("jh.toml"))).unwrap();

            assert_eq!(config.url.as_deref(), Some("https://file.example.com"));
            assert_eq!(config.output_dir, PathBuf::from("exports"));
            assert_eq!(config.max_issues, 7);
            assert_eq!(config.run_timeout(), Some(Duration::from_secs(600)));
            Ok(())
        });
    }

    #[test]
    fn user_config_file_is_loaded() {
        Jail::expect_with(|jail| {
            let home = jail.directory().to_path_buf();
            jail.set_env("XDG_CONFIG_HOME", home.display());
            std::fs::create_dir(home.join("jira-history")).unwrap();
            jail.create_file("jira-history/config.toml", r#"bind = "0.0.0.0:8080""#)?;

            let config = Config::load().unwrap();

            assert_eq!(config.bind, "0.0.0.0:8080");
            Ok(())
        });
    }

    #[test]
    fn missing_url_names_variable() {
        let config = Config {
            personal_access_token: Some("token".to_string()),
            ..Config::default()
        };
        let err = config.credentials().unwrap_err();
        assert!(err.to_string().starts_with("JIRA_URL is not set"));
    }

    #[test]
    fn blank_token_names_variable() {
        let config = Config {
            url: Some("https://jira.example.com".to_string()),
            personal_access_token: Some("  ".to_string()),
            ..Config::default()
        };
        let err = config.credentials().unwrap_err();
        assert!(
            err.to_string()
                .starts_with("JIRA_PERSONAL_ACCESS_TOKEN is not set")
        );
    }

    #[test]
    fn debug_redacts_token() {
        let config = Config {
            url: Some("https://jira.example.com".to_string()),
            personal_access_token: Some("pat-secret".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("pat-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn zero_concurrency_is_sequential() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert_eq!(config.aggregate_options().concurrency, 1);
    }
}
