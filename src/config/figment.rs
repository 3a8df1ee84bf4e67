use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

use crate::bin_constants::APP_CONFIG_ENV_PREFIX;
use crate::config::AppConfig;

pub trait FigmentExt {
    fn setup_app_config(self, config_file: impl AsRef<Path>) -> Figment;
}

impl FigmentExt for Figment {
    /// Defaults, overridden by the config file, overridden by
    /// `SCRAPNOTE_`-prefixed environment variables.
    fn setup_app_config(self, config_file: impl AsRef<Path>) -> Figment {
        self.merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file_exact(config_file))
            .merge(Env::prefixed(APP_CONFIG_ENV_PREFIX).global())
    }
}
