//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Approval behaviour switches.
    #[serde(default)]
    pub approval: ApprovalSettings,
    /// Cache sizing.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// System settings that steer approval decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ApprovalSettings {
    /// Data must be accepted at a level before it can be approved at the
    /// next higher level.
    #[serde(default)]
    pub acceptance_required: bool,
    /// Hide data that is not yet approved up to the reader's level.
    #[serde(default)]
    pub hide_unapproved: bool,
}

/// Cache configuration for resolved user approval levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of (user, org unit) entries.
    #[serde(default = "default_user_level_capacity")]
    pub user_level_capacity: u64,
    /// Time-to-live in seconds for each entry.
    #[serde(default = "default_user_level_ttl")]
    pub user_level_ttl_secs: u64,
}

fn default_user_level_capacity() -> u64 {
    10_000
}

fn default_user_level_ttl() -> u64 {
    600 // 10 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user_level_capacity: default_user_level_capacity(),
            user_level_ttl_secs: default_user_level_ttl(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `.env`, config files, and the environment.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `ATTEST__SECTION__KEY` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("ATTEST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
