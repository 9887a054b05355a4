use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Directory holding a `Settings.toml` that overrides the working-directory one
pub const SECRETS_DIR_ENV: &str = "BROKER_SECRETS_DIR";

const SETTINGS_FILE: &str = "Settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BrokerSettings {
    pub application: ApplicationSettings,
    pub session: SessionSettings,
    pub cookies: CookieSettings,
    pub pages: PagesSettings,
    pub logging: LoggingSettings,
    pub notion: NotionSettings,
}

/// Deployment environment; drives the cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    /// Parse `production`/`prod` or `development`/`dev`, case-insensitively
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub redirect_base_url: String,
    pub cors_origins: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub session_duration_hours: u64,
    pub session_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    /// Base name the session, callback-url and CSRF cookie names are built from
    pub base_name: String,
}

/// Where the browser lands after sign-out or a failed sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagesSettings {
    pub sign_out: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Forces debug-level logging regardless of `level`
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Defaults to `{redirect_base_url}/auth/callback/notion` when empty
    pub redirect_uri: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub request_timeout_seconds: u64,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            redirect_base_url: "http://localhost:8080".to_string(),
            cors_origins: "http://localhost:3000,http://localhost:8080".to_string(),
            environment: Environment::Production,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_duration_hours: 720,   // 30 days
            session_secret: String::new(), // Required in production, generated in development
        }
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            base_name: crate::session::cookie::DEFAULT_COOKIE_BASE.to_string(),
        }
    }
}

impl Default for PagesSettings {
    fn default() -> Self {
        Self {
            sign_out: "/".to_string(),
            error: "/".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug: false,
        }
    }
}

impl Default for NotionSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            authorization_endpoint: "https://api.notion.com/v1/oauth/authorize".to_string(),
            token_endpoint: "https://api.notion.com/v1/oauth/token".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl BrokerSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// Priority, highest first:
    /// 1. Environment variables
    /// 2. `Settings.toml` in `BROKER_SECRETS_DIR` (if set and present)
    /// 3. `Settings.toml` in the current directory (if present)
    /// 4. Defaults
    ///
    /// A `.env` file in the current directory is read into the environment first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A settings file exists but cannot be read or parsed
    /// - No session secret is configured in production
    /// - The session duration is zero
    pub fn load() -> Result<Self> {
        Self::load_env_file(Path::new(".env"));

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);
        settings.ensure_session_lifetime()?;
        settings.ensure_session_secret()?;

        Ok(settings)
    }

    fn load_base_settings() -> Result<Self> {
        let mut settings = Self::load_file(Path::new(SETTINGS_FILE))?.unwrap_or_default();

        if let Ok(secrets_dir) = std::env::var(SECRETS_DIR_ENV) {
            let secrets_path = Path::new(&secrets_dir).join(SETTINGS_FILE);
            match Self::load_file(&secrets_path)? {
                Some(secrets_settings) => settings = secrets_settings,
                None => println!(
                    "{SECRETS_DIR_ENV} set but no {SETTINGS_FILE} found at: {}",
                    secrets_path.display()
                ),
            }
        }

        Ok(settings)
    }

    /// Parse one settings file, or `None` if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings = basic_toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        println!("Loaded settings from {}", path.display());
        Ok(Some(settings))
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_session_env_overrides(&mut settings.session);
        Self::apply_logging_env_overrides(&mut settings.logging);
        Self::apply_notion_env_overrides(&mut settings.notion);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(redirect_base_url) = std::env::var("REDIRECT_BASE_URL") {
            app_settings.redirect_base_url = redirect_base_url;
        }
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
        if let Ok(environment) = std::env::var("BROKER_ENV") {
            match Environment::parse(&environment) {
                Some(environment) => app_settings.environment = environment,
                None => eprintln!("Ignoring unknown BROKER_ENV value '{environment}'"),
            }
        }
    }

    fn apply_session_env_overrides(session_settings: &mut SessionSettings) {
        if let Ok(hours) = std::env::var("SESSION_DURATION_HOURS") {
            if let Ok(hours) = hours.parse::<u64>() {
                session_settings.session_duration_hours = hours;
            }
        }
        if let Ok(secret) = std::env::var("AUTH_SECRET") {
            if !secret.is_empty() {
                session_settings.session_secret = secret;
            }
        }
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(level) = std::env::var("RUST_LOG") {
            logging_settings.level = level;
        }
        // Any non-empty value enables debug output
        if std::env::var("AUTH_DEBUG").is_ok_and(|value| !value.is_empty()) {
            logging_settings.debug = true;
        }
    }

    fn apply_notion_env_overrides(notion_settings: &mut NotionSettings) {
        if let Ok(client_id) = std::env::var("AUTH_NOTION_ID") {
            notion_settings.client_id = client_id;
        }
        if let Ok(client_secret) = std::env::var("AUTH_NOTION_SECRET") {
            notion_settings.client_secret = client_secret;
        }
        if let Ok(redirect_uri) = std::env::var("AUTH_NOTION_REDIRECT_URI") {
            notion_settings.redirect_uri = redirect_uri;
        }
    }

    /// Reject a zero session duration, which would expire every session on issue
    ///
    /// # Errors
    ///
    /// Returns an error if `session_duration_hours` is zero
    pub fn ensure_session_lifetime(&self) -> Result<()> {
        if self.session.session_duration_hours == 0 {
            bail!(
                "session_duration_hours must be at least 1 \
                 (check SESSION_DURATION_HOURS or session.session_duration_hours)"
            );
        }
        Ok(())
    }

    /// Fail in production without a secret; generate one in development
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is empty and the environment is production
    pub fn ensure_session_secret(&mut self) -> Result<()> {
        if !self.session.session_secret.is_empty() {
            return Ok(());
        }
        if self.application.environment.is_production() {
            bail!(
                "No session secret configured: set AUTH_SECRET or session.session_secret \
                 (or BROKER_ENV=development for a generated one)"
            );
        }

        self.session.session_secret = Self::generate_random_session_secret();
        // The logger is configured from these settings, so it is not up yet
        eprintln!(
            "WARNING: using an auto-generated session secret; sessions will not survive a restart"
        );
        eprintln!("Set AUTH_SECRET or session.session_secret in Settings.toml to keep them");
        Ok(())
    }

    /// 32 bytes from the thread RNG, base64-encoded
    fn generate_random_session_secret() -> String {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        general_purpose::STANDARD.encode(secret)
    }

    /// Load `KEY=VALUE` lines from a dotenv file into the process environment
    ///
    /// Variables already set in the environment keep their value.
    pub fn load_env_file(path: &Path) {
        let Ok(contents) = fs::read_to_string(path) else {
            return;
        };
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if std::env::var_os(key).is_none() {
                    std::env::set_var(key, value.trim().trim_matches('"'));
                }
            }
        }
    }

    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// The redirect URI registered with Notion
    #[must_use]
    pub fn notion_redirect_uri(&self) -> String {
        if self.notion.redirect_uri.is_empty() {
            format!(
                "{}/auth/callback/notion",
                self.application.redirect_base_url.trim_end_matches('/')
            )
        } else {
            self.notion.redirect_uri.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "REDIRECT_BASE_URL",
        "CORS_ORIGINS",
        "BROKER_ENV",
        "AUTH_SECRET",
        "SESSION_DURATION_HOURS",
        "AUTH_NOTION_ID",
        "AUTH_NOTION_SECRET",
        "AUTH_NOTION_REDIRECT_URI",
        "AUTH_DEBUG",
        "RUST_LOG",
        SECRETS_DIR_ENV,
    ];

    fn clean_env_vars() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    fn write_settings(dir: &Path, content: &str) {
        let mut file = fs::File::create(dir.join(SETTINGS_FILE)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_defaults() {
        let settings = BrokerSettings::default();
        assert_eq!(settings.application.environment, Environment::Production);
        assert_eq!(settings.session.session_duration_hours, 720);
        assert_eq!(settings.session.session_secret, "");
        assert_eq!(settings.cookies.base_name, "authjs");
        assert_eq!(settings.pages.sign_out, "/");
        assert_eq!(settings.logging.level, "info");
        assert!(!settings.logging.debug);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: BrokerSettings = basic_toml::from_str(
            r#"
            [application]
            port = 9000
            environment = "development"

            [notion]
            client_id = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(settings.application.port, 9000);
        assert_eq!(settings.application.host, "0.0.0.0");
        assert_eq!(settings.application.environment, Environment::Development);
        assert_eq!(settings.notion.client_id, "abc");
        assert_eq!(
            settings.notion.token_endpoint,
            "https://api.notion.com/v1/oauth/token"
        );
        assert_eq!(settings.session.session_duration_hours, 720);
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Some(Environment::Production));
        assert_eq!(Environment::parse(" Dev "), Some(Environment::Development));
        assert_eq!(Environment::parse("staging"), None);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clean_env_vars();
        std::env::set_var("PORT", "9443");
        std::env::set_var("BROKER_ENV", "development");
        std::env::set_var("AUTH_SECRET", "env-secret");
        std::env::set_var("SESSION_DURATION_HOURS", "48");
        std::env::set_var("AUTH_NOTION_ID", "client-id");
        std::env::set_var("AUTH_NOTION_SECRET", "client-secret");
        std::env::set_var("AUTH_DEBUG", "1");

        let mut settings = BrokerSettings::default();
        BrokerSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.port, 9443);
        assert_eq!(settings.application.environment, Environment::Development);
        assert_eq!(settings.session.session_secret, "env-secret");
        assert_eq!(settings.session.session_duration_hours, 48);
        assert_eq!(settings.notion.client_id, "client-id");
        assert_eq!(settings.notion.client_secret, "client-secret");
        assert!(settings.logging.debug);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_ignored() {
        clean_env_vars();
        std::env::set_var("PORT", "not-a-port");
        std::env::set_var("BROKER_ENV", "staging");
        std::env::set_var("AUTH_SECRET", "");

        let mut settings = BrokerSettings::default();
        settings.session.session_secret = "file-secret".to_string();
        BrokerSettings::apply_env_overrides(&mut settings);

        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.application.environment, Environment::Production);
        assert_eq!(settings.session.session_secret, "file-secret");

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_secrets_dir_then_env_precedence() {
        clean_env_vars();
        let dir = tempfile::tempdir().unwrap();
        write_settings(
            dir.path(),
            r#"
            [application]
            port = 7000
            environment = "development"

            [session]
            session_secret = "secrets-dir-secret"
            "#,
        );
        std::env::set_var(SECRETS_DIR_ENV, dir.path());
        std::env::set_var("PORT", "7001");

        let settings = BrokerSettings::load().unwrap();
        assert_eq!(settings.application.port, 7001);
        assert_eq!(settings.session.session_secret, "secrets-dir-secret");
        assert_eq!(settings.application.environment, Environment::Development);

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_unparseable_settings_file_is_an_error() {
        clean_env_vars();
        let dir = tempfile::tempdir().unwrap();
        write_settings(dir.path(), "[application\nport = ");
        std::env::set_var(SECRETS_DIR_ENV, dir.path());
        std::env::set_var("AUTH_SECRET", "secret");

        assert!(BrokerSettings::load().is_err());

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_production_requires_secret() {
        clean_env_vars();
        std::env::set_var("BROKER_ENV", "production");

        let err = BrokerSettings::load().unwrap_err();
        assert!(err.to_string().contains("No session secret configured"));

        clean_env_vars();
    }

    #[test]
    fn test_zero_session_duration_is_rejected() {
        let mut settings = BrokerSettings::default();
        assert!(settings.ensure_session_lifetime().is_ok());

        settings.session.session_duration_hours = 0;
        let err = settings.ensure_session_lifetime().unwrap_err();
        assert!(err.to_string().contains("session_duration_hours"));
    }

    #[test]
    #[serial]
    fn test_zero_session_duration_from_env_fails_load() {
        clean_env_vars();
        std::env::set_var("AUTH_SECRET", "secret");
        std::env::set_var("SESSION_DURATION_HOURS", "0");

        let err = BrokerSettings::load().unwrap_err();
        assert!(err.to_string().contains("session_duration_hours"));

        clean_env_vars();
    }

    #[test]
    fn test_development_generates_secret() {
        let mut first = BrokerSettings::default();
        first.application.environment = Environment::Development;
        first.ensure_session_secret().unwrap();

        let mut second = first.clone();
        second.session.session_secret.clear();
        second.ensure_session_secret().unwrap();

        assert!(first.session.session_secret.len() > 40);
        assert_ne!(first.session.session_secret, second.session.session_secret);
    }

    #[test]
    #[serial]
    fn test_env_file_does_not_override_existing_vars() {
        clean_env_vars();
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(
            &env_path,
            "# local overrides\nAUTH_NOTION_ID=\"from-file\"\nAUTH_NOTION_SECRET=file-secret\n",
        )
        .unwrap();
        std::env::set_var("AUTH_NOTION_SECRET", "from-env");

        BrokerSettings::load_env_file(&env_path);

        assert_eq!(std::env::var("AUTH_NOTION_ID").unwrap(), "from-file");
        assert_eq!(std::env::var("AUTH_NOTION_SECRET").unwrap(), "from-env");

        clean_env_vars();
    }

    #[test]
    fn test_notion_redirect_uri_default() {
        let mut settings = BrokerSettings::default();
        settings.application.redirect_base_url = "https://auth.example.com/".to_string();
        assert_eq!(
            settings.notion_redirect_uri(),
            "https://auth.example.com/auth/callback/notion"
        );

        settings.notion.redirect_uri = "https://custom.example.com/cb".to_string();
        assert_eq!(settings.notion_redirect_uri(), "https://custom.example.com/cb");
    }

    #[test]
    fn test_cors_origins() {
        let mut settings = BrokerSettings::default();
        settings.application.cors_origins = "https://a.example.com, https://b.example.com,".into();
        assert_eq!(
            settings.get_cors_origins(),
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }
}
