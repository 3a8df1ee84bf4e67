pub const DEFAULT_CONFIG_FILE: &str = "/etc/scrapnote/scrapnoted.toml";
pub const APP_CONFIG_ENV_PREFIX: &str = "SCRAPNOTE_";
