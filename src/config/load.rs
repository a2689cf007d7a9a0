use std::{env, path::PathBuf};

use super::schema::{BookmarkSettings, LibrarySettings, Settings};

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then lets environment
/// variables (prefix `CADENZA__`) override it, and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("CADENZA")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the config is unreadable or invalid.
    pub fn load_or_default() -> Self {
        // The logger is configured from these settings, so it is not installed yet.
        match Self::load() {
            Ok(s) => match s.validate() {
                Ok(()) => s,
                Err(msg) => {
                    eprintln!("cadenza: invalid config, using defaults: {msg}");
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("cadenza: failed to load config, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let usable = self
            .library
            .extensions
            .iter()
            .any(|e| !e.trim().trim_start_matches('.').is_empty());
        if !usable {
            return Err("library.extensions must name at least one extension".to_string());
        }
        Ok(())
    }
}

impl BookmarkSettings {
    /// The configured store path, or `bookmarks.toml` under the state directory.
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        self.store_path
            .clone()
            .or_else(|| default_state_dir().map(|d| d.join("bookmarks.toml")))
    }
}

impl LibrarySettings {
    /// The configured cache path, or `library.toml` under the state directory.
    pub fn resolved_cache_path(&self) -> Option<PathBuf> {
        self.cache_path
            .clone()
            .or_else(|| default_state_dir().map(|d| d.join("library.toml")))
    }
}

/// Resolve the config path from `CADENZA_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("CADENZA_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// `$XDG_CONFIG_HOME/cadenza/config.toml`, or `~/.config/cadenza/config.toml`
/// when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", &[".config"]).map(|d| d.join("cadenza").join("config.toml"))
}

/// `$XDG_STATE_HOME/cadenza`, or `~/.local/state/cadenza`.
///
/// Bookmarks and the library cache live here.
pub fn default_state_dir() -> Option<PathBuf> {
    xdg_dir("XDG_STATE_HOME", &[".local", "state"]).map(|d| d.join("cadenza"))
}

fn xdg_dir(var: &str, home_fallback: &[&str]) -> Option<PathBuf> {
    if let Some(dir) = env::var_os(var).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    env::var_os("HOME").map(|home| {
        home_fallback
            .iter()
            .fold(PathBuf::from(home), |acc, part| acc.join(part))
    })
}
