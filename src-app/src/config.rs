//! Configuration for ExtShot.
//!
//! Optional overrides are read from the platform-standard config directory:
//! - Linux: `~/.config/extshot/config.json`
//! - macOS: `~/Library/Application Support/extshot/config.json`
//! - Windows: `%APPDATA%\extshot\config.json`
//!
//! The file is never written by the application. Missing or invalid files
//! fall back to defaults.

use directories::{ProjectDirs, UserDirs};
use extshot_types::PresetSize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::persist::DEFAULT_FILE_PREFIX;

/// Environment variable overriding the output directory.
pub const OUTPUT_DIR_ENV: &str = "EXTSHOT_OUTPUT_DIR";

/// Output-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Custom output directory. If None, uses the Downloads folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// File name prefix.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Whether to select saved files in the file browser.
    #[serde(default = "default_true")]
    pub reveal_in_file_browser: bool,
    /// Whether to play a sound after saving.
    #[serde(default = "default_true")]
    pub play_sound: bool,
}

fn default_file_prefix() -> String {
    DEFAULT_FILE_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: default_file_prefix(),
            reveal_in_file_browser: true,
            play_sound: true,
        }
    }
}

/// One global hotkey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotkeyBinding {
    /// Key combination such as `alt+shift+1`
    pub combination: String,
    /// Preset captured when the combination is pressed
    pub preset: PresetSize,
}

fn default_hotkeys() -> Vec<HotkeyBinding> {
    vec![
        HotkeyBinding {
            combination: "alt+shift+1".to_string(),
            preset: PresetSize::LARGE,
        },
        HotkeyBinding {
            combination: "alt+shift+2".to_string(),
            preset: PresetSize::SMALL,
        },
    ]
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output settings group.
    #[serde(default)]
    pub output: OutputConfig,
    /// Global hotkeys; replaces the defaults when present.
    #[serde(default = "default_hotkeys")]
    pub hotkeys: Vec<HotkeyBinding>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: OutputConfig::default(),
            hotkeys: default_hotkeys(),
        }
    }
}

/// Get the path to the config file.
pub fn get_config_path() -> Result<PathBuf, String> {
    let proj_dirs =
        ProjectDirs::from("", "", "extshot").ok_or("Could not determine config directory")?;
    Ok(proj_dirs.config_dir().join("config.json"))
}

/// Load configuration from the standard location.
/// Returns default config if the file doesn't exist or is invalid.
pub fn load_config() -> AppConfig {
    match get_config_path() {
        Ok(path) => load_config_from(&path),
        Err(e) => {
            warn!("Failed to get config path: {}", e);
            AppConfig::default()
        }
    }
}

/// Load configuration from `path`, falling back to defaults.
pub fn load_config_from(path: &Path) -> AppConfig {
    if !path.exists() {
        info!("No config file at {:?}, using defaults", path);
        return AppConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Failed to parse config file: {}. Using defaults.", e);
                AppConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}. Using defaults.", e);
            AppConfig::default()
        }
    }
}

/// Get the default output directory (the user's Downloads folder).
pub fn get_default_output_dir() -> Result<PathBuf, String> {
    let user_dirs = UserDirs::new().ok_or("Could not determine user directories")?;

    // Downloads first, then ~/Downloads, then home
    let output_dir = user_dirs
        .download_dir()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| {
            let home = user_dirs.home_dir().to_path_buf();
            let downloads = home.join("Downloads");
            if downloads.is_dir() {
                downloads
            } else {
                home
            }
        });

    Ok(output_dir)
}

/// Resolve the output directory: explicit override, then the
/// `EXTSHOT_OUTPUT_DIR` environment variable, then the config file, then
/// the default.
pub fn resolve_output_dir(config: &AppConfig, cli_override: Option<&Path>) -> Result<PathBuf, String> {
    if let Some(dir) = cli_override {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(OUTPUT_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    match &config.output.directory {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => get_default_output_dir(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.output.directory.is_none());
        assert_eq!(config.output.file_prefix, "screenshot");
        assert!(config.output.reveal_in_file_browser);
        assert!(config.output.play_sound);
        assert_eq!(config.hotkeys.len(), 2);
        assert_eq!(config.hotkeys[0].preset, PresetSize::LARGE);
        assert_eq!(config.hotkeys[1].combination, "alt+shift+2");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{"output": {"directory": "/tmp/shots", "play_sound": false}}"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.output.directory.as_deref(), Some("/tmp/shots"));
        assert!(!parsed.output.play_sound);
        assert!(parsed.output.reveal_in_file_browser);
        assert_eq!(parsed.output.file_prefix, "screenshot");
        assert_eq!(parsed.hotkeys, default_hotkeys());
    }

    #[test]
    fn test_custom_hotkeys() {
        let json = r#"{"hotkeys": [{"combination": "ctrl+alt+s", "preset": "small"}]}"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.hotkeys,
            vec![HotkeyBinding {
                combination: "ctrl+alt+s".to_string(),
                preset: PresetSize::SMALL,
            }]
        );
    }

    #[test]
    fn test_empty_directory_not_serialized() {
        let json = serde_json::to_string(&AppConfig::default()).unwrap();
        assert!(!json.contains("directory"));
    }

    #[test]
    fn test_load_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_config_from(&dir.path().join("nope.json"));
        assert_eq!(missing.hotkeys.len(), 2);

        let bad = dir.path().join("config.json");
        fs::write(&bad, "{ not json").unwrap();
        let parsed = load_config_from(&bad);
        assert!(parsed.output.directory.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"output": {"file_prefix": "cap"}}"#).unwrap();
        assert_eq!(load_config_from(&path).output.file_prefix, "cap");
    }

    #[test]
    fn test_cli_override_wins() {
        let mut config = AppConfig::default();
        config.output.directory = Some("/from/config".to_string());
        let dir = resolve_output_dir(&config, Some(Path::new("/from/cli"))).unwrap();
        assert_eq!(dir, PathBuf::from("/from/cli"));
    }
}
