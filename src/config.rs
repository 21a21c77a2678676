use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const TOKEN_ENV: &str = "YOUBOARD_TOKEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub theme: Theme,
    pub settings: Settings,
    pub keybindings: Keybindings,
}

/// YouTrack instance and permanent token
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub token: String,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Auto-refresh interval in seconds (0 to disable)
    pub refresh_interval: u64,
    /// API request timeout in seconds
    pub api_timeout: u64,
    /// Seconds before a status message disappears
    pub status_timeout: u64,
}

/// Customizable keybindings (single character keys)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Keybindings {
    // Navigation
    pub down: char,
    pub up: char,
    pub left: char,
    pub right: char,
    pub next_card: char,
    pub prev_card: char,
    // Actions
    pub collapse: char,
    pub open: char,
    pub copy_id: char,
    // Screens
    pub menu: char,
    pub select_sprint: char,
    pub refresh: char,
    pub help: char,
    pub quit: char,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub border: String,
    pub border_active: String,
    pub text: String,
    pub text_muted: String,
    pub highlight: String,
    pub selected_bg: String,
    pub card_resolved: String,
    pub header_bg: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval: 300, // 5 minutes
            api_timeout: 30,
            status_timeout: 5,
        }
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            down: 'j',
            up: 'k',
            left: 'h',
            right: 'l',
            next_card: 'J',
            prev_card: 'K',
            collapse: 'z',
            open: 'o',
            copy_id: 'y',
            menu: 'm',
            select_sprint: 's',
            refresh: 'r',
            help: '?',
            quit: 'q',
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            // One Dark
            border: "#5c6370".to_string(),
            border_active: "#61afef".to_string(),
            text: "#abb2bf".to_string(),
            text_muted: "#5c6370".to_string(),
            highlight: "#e06c9f".to_string(),
            selected_bg: "#2c323c".to_string(),
            card_resolved: "#98c379".to_string(),
            header_bg: "#21252b".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.token.trim().is_empty()
    }
}

impl Config {
    /// Candidate config files, in lookup order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".config").join("youboard").join("config.toml"));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("youboard").join("config.toml"));
        }
        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".youboard.toml"));
        }
        paths
    }

    /// Load from an explicit path, or the first readable file in `search_paths`.
    /// `YOUBOARD_TOKEN` replaces the token either way.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::search_paths()
                .iter()
                .find(|p| p.is_file())
                .map(|p| Self::from_file(p))
                .transpose()?
                .unwrap_or_default(),
        };

        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                config.server.token = token;
            }
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

impl Theme {
    pub fn parse_color(&self, hex: &str) -> ratatui::style::Color {
        // "#rrggbb"
        let channel = |range: std::ops::Range<usize>| {
            hex.get(range).and_then(|c| u8::from_str_radix(c, 16).ok())
        };
        if hex.starts_with('#') && hex.len() == 7 {
            if let (Some(r), Some(g), Some(b)) = (channel(1..3), channel(3..5), channel(5..7)) {
                return ratatui::style::Color::Rgb(r, g, b);
            }
        }
        ratatui::style::Color::White
    }
}
