//! Configuration management for unicguard.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.unicguard/config.toml`
//! - Session guard toggles
//! - Color pair limits
//! - Named text styles
//!
//! # Configuration File
//!
//! ```toml
//! [guard]
//! start_color = true
//! noecho = true
//! hide_cursor = true
//! keypad = true
//! show_exceptions = false
//! propagate_failures = false
//!
//! [colors]
//! first_pair_id = 256
//! # max_pairs = 32767      # defaults to the terminal's limit
//!
//! [styles.title]
//! fg = 15
//! bg = 4
//! attrs = ["bold"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{ColorError, ColorRegistry, DEFAULT_FIRST_PAIR_ID};
use crate::guard::GuardOptions;
use crate::style::{Style, StyleSpec};
use crate::term::Terminal;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config: {0}")]
    Io(#[from] io::Error),

    #[error("Could not determine config path")]
    NoHomeDir,
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session guard toggles
    pub guard: GuardOptions,
    /// Color pair allocation
    pub colors: ColorsConfig,
    /// Named styles
    pub styles: BTreeMap<String, StyleSpec>,
}

/// Color pair allocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// First pair id handed out
    pub first_pair_id: u16,
    /// Upper pair limit; the terminal's own limit when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pairs: Option<u16>,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            first_pair_id: DEFAULT_FIRST_PAIR_ID,
            max_pairs: None,
        }
    }
}

impl ColorsConfig {
    /// Build a registry for `terminal`. A configured limit never exceeds
    /// what the terminal supports.
    pub fn registry<T: Terminal + ?Sized>(&self, terminal: &T) -> ColorRegistry {
        let terminal_max = terminal.max_color_pairs();
        let max = self.max_pairs.map_or(terminal_max, |m| m.min(terminal_max));
        ColorRegistry::new(self.first_pair_id, max)
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                match fs::read_to_string(&path) {
                    Ok(content) => match Self::from_toml_str(&content) {
                        Ok(config) => return config,
                        Err(e) => tracing::warn!("Ignoring {}: {}", path.display(), e),
                    },
                    Err(e) => tracing::warn!("Could not read {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::get_config_path().ok_or(ConfigError::NoHomeDir)?;
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Get config file path
    pub fn get_config_path() -> Option<PathBuf> {
        let dir = Self::get_config_dir()?;
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir.join("config.toml"))
    }

    /// Directory holding the config and log files
    pub fn get_config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".unicguard"))
    }

    /// Build every configured style, in name order
    pub fn build_styles<T: Terminal + ?Sized>(
        &self,
        registry: &mut ColorRegistry,
        terminal: &mut T,
    ) -> Result<BTreeMap<String, Style>, ColorError> {
        let mut styles = BTreeMap::new();
        for (name, spec) in &self.styles {
            styles.insert(name.clone(), spec.build(registry, terminal)?);
        }
        Ok(styles)
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorPairId;
    use crate::term::recording::RecordingTerminal;
    use crate::term::Attr;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.guard.start_color);
        assert!(config.guard.noecho);
        assert!(!config.guard.show_exceptions);
        assert_eq!(config.colors.first_pair_id, 256);
    }

    #[test]
    fn test_partial_guard_section() {
        let config = Config::from_toml_str(
            r#"
            [guard]
            hide_cursor = false
            show_exceptions = true
            "#,
        )
        .unwrap();
        assert!(!config.guard.hide_cursor);
        assert!(config.guard.show_exceptions);
        assert!(config.guard.keypad);
    }

    #[test]
    fn test_styles_section() {
        let config = Config::from_toml_str(
            r#"
            [styles.title]
            fg = 15
            bg = 4
            attrs = ["bold", "underline"]

            [styles.plain]
            fg = 7
            "#,
        )
        .unwrap();

        let title = &config.styles["title"];
        assert_eq!(title.bg, Some(4));
        assert_eq!(title.attrs, vec![Attr::Bold, Attr::Underline]);
        assert_eq!(config.styles["plain"].bg, None);

        let mut term = RecordingTerminal::with_colors();
        let mut registry = config.colors.registry(&term);
        let styles = config.build_styles(&mut registry, &mut term).unwrap();
        // BTreeMap order: plain, title
        assert_eq!(styles["plain"].pair(), ColorPairId(256));
        assert_eq!(styles["title"].pair(), ColorPairId(257));
    }

    #[test]
    fn test_invalid_color_code_rejected() {
        let result = Config::from_toml_str("[styles.bad]\nfg = 300\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_attr_aliases_accepted() {
        let config = Config::from_toml_str(
            "[styles.alert]\nfg = 1\nattrs = [\"standout\", \"Underlined\"]\n",
        )
        .unwrap();
        assert_eq!(config.styles["alert"].attrs, vec![Attr::Reverse, Attr::Underline]);
    }

    #[test]
    fn test_unknown_attr_rejected() {
        let result = Config::from_toml_str("[styles.bad]\nfg = 1\nattrs = [\"sparkly\"]\n");
        match result {
            Err(ConfigError::Parse(e)) => assert!(e.to_string().contains("sparkly")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_max_pairs_clamped_to_terminal() {
        let mut term = RecordingTerminal::with_colors();
        term.max_pairs = 300;

        let colors = ColorsConfig {
            first_pair_id: 256,
            max_pairs: Some(1000),
        };
        assert_eq!(colors.registry(&term).max_pairs(), 300);

        let colors = ColorsConfig {
            first_pair_id: 1,
            max_pairs: Some(8),
        };
        let registry = colors.registry(&term);
        assert_eq!(registry.max_pairs(), 8);
        assert_eq!(registry.remaining(), 7);
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = Config::default();
        config.guard.show_exceptions = true;
        config.styles.insert(
            "warn".to_string(),
            StyleSpec {
                fg: 3,
                bg: None,
                attrs: vec![Attr::Bold],
            },
        );
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }
}
