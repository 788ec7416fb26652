use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "default_token_lifetime")]
    token_lifetime_hours: i64,
    #[serde(default = "default_admin")]
    admin_username: String,
    #[serde(default = "default_admin")]
    admin_password: String,
    #[serde(default = "default_uploads_dir")]
    uploads_dir: String,
    #[serde(default = "default_locale")]
    default_locale: String,
}

fn default_token_lifetime() -> i64 {
    24
}

fn default_admin() -> String {
    String::from("admin")
}

fn default_uploads_dir() -> String {
    String::from("uploads")
}

fn default_locale() -> String {
    String::from("en")
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    let config: Self = toml::from_slice(&bytes)?;
                    config.validate()?;
                    Ok(config)
                };

                match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Unable to load config.");
                        std::process::exit(1);
                    }
                }
            })
            .await
    }

    pub fn from_toml(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.app.jwt.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "app.jwt",
                reason: String::from("secret must not be empty"),
            });
        }
        if self.app.token_lifetime_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "app.token_lifetime_hours",
                reason: format!("expected a positive number, got {}", self.app.token_lifetime_hours),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    #[inline]
    pub fn token_lifetime_hours(&self) -> i64 {
        self.token_lifetime_hours
    }

    #[inline]
    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    #[inline]
    pub fn admin_password(&self) -> &str {
        &self.admin_password
    }

    #[inline]
    pub fn uploads_dir(&self) -> &str {
        &self.uploads_dir
    }

    #[inline]
    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn config_test() {
        let config = Config::get_or_init(true).await;
        assert_eq!(config.host().bindto(), "127.0.0.1:5000"); // defaults
    }

    #[test]
    fn optional_keys_fall_back_to_defaults() {
        let config = Config::from_toml(
            r#"
            [host]
            bindto = "0.0.0.0:8080"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/lms"
            "#,
        )
        .unwrap();

        assert!(!config.app().docs());
        assert_eq!(config.app().token_lifetime_hours(), 24);
        assert_eq!(config.app().admin_username(), "admin");
        assert_eq!(config.app().uploads_dir(), "uploads");
        assert_eq!(config.app().default_locale(), "en");
    }

    #[test]
    fn missing_jwt_is_rejected() {
        let result = Config::from_toml(
            r#"
            [host]
            bindto = "0.0.0.0:8080"

            [app]
            database_uri = "postgres://localhost/lms"
            "#,
        );

        assert!(matches!(result, Err(ConfigError::TomlDeError(_))));
    }

    #[test]
    fn non_positive_token_lifetime_is_rejected() {
        let result = Config::from_toml(
            r#"
            [host]
            bindto = "0.0.0.0:8080"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/lms"
            token_lifetime_hours = 0
            "#,
        );

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "app.token_lifetime_hours", .. })
        ));
    }
}
