//! Persistent engine settings (JSON file in the app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use voiceflow_core::EngineSettings;

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Voiceflow")
            .join("settings.json")
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("Library")
            .join("Application Support")
            .join("Voiceflow")
            .join("settings.json")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".config")
            })
            .join("voiceflow")
            .join("settings.json")
    }
}

/// Load settings from `path`. A missing or unreadable file yields defaults.
pub fn load_settings(path: &Path) -> EngineSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<EngineSettings>(&raw).unwrap_or_else(|e| {
            warn!("ignoring malformed settings at {}: {e}", path.display());
            EngineSettings::default()
        }),
        Err(_) => {
            debug!("no settings at {}; using defaults", path.display());
            EngineSettings::default()
        }
    };
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &EngineSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voiceflow_core::DictationMode;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("voiceflow-settings-{}-{name}", std::process::id()))
            .join("settings.json")
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = load_settings(&scratch_path("missing"));
        assert_eq!(settings, {
            let mut d = EngineSettings::default();
            d.normalize();
            d
        });
    }

    #[test]
    fn saved_settings_load_back() {
        let path = scratch_path("roundtrip");
        let settings = EngineSettings {
            dictation_mode: DictationMode::Live,
            command_delay_ms: 0,
            providers: vec!["deepgram".into()],
            ..EngineSettings::default()
        };
        save_settings(&path, &settings).unwrap();
        let loaded = load_settings(&path);
        assert_eq!(loaded.dictation_mode, DictationMode::Live);
        assert_eq!(loaded.command_delay_ms, 0);
        assert_eq!(loaded.providers, vec!["deepgram"]);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = scratch_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path).wake_word, "voiceflow");
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
