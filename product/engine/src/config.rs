use crate::paths::AppPaths;
use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// User-tunable knobs that feed the job configuration. Every field has a
/// default so a partial or missing settings file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// yt-dlp format selector.
    pub audio_format: String,
    pub audio_codec: String,
    pub audio_quality: String,
    pub thumbnail_format: String,
    /// Browser to read cookies from; `None` disables cookie import.
    pub cookies_from_browser: Option<String>,
    /// Explicit yt-dlp executable, tried before any other candidate.
    pub yt_dlp_path: Option<String>,
    pub overwrite: bool,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            audio_format: "ba".to_string(),
            audio_codec: "m4a".to_string(),
            audio_quality: "5".to_string(),
            thumbnail_format: "jpg".to_string(),
            cookies_from_browser: Some("chromium".to_string()),
            yt_dlp_path: None,
            overwrite: false,
        }
    }
}

pub fn load_download_settings(paths: &AppPaths) -> Result<DownloadSettings> {
    let path = paths.settings_path();
    if !path.exists() {
        return Ok(DownloadSettings::default());
    }
    let bytes = std::fs::read(&path)?;
    let parsed: DownloadSettings = serde_json::from_slice(&bytes)
        .map_err(|source| EngineError::SettingsInvalid { path, source })?;
    Ok(parsed)
}

pub fn save_download_settings(paths: &AppPaths, settings: &DownloadSettings) -> Result<()> {
    let path = paths.settings_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());

        let settings = load_download_settings(&paths).expect("load");
        assert_eq!(settings, DownloadSettings::default());
        assert_eq!(settings.cookies_from_browser.as_deref(), Some("chromium"));
    }

    #[test]
    fn partial_settings_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        paths.ensure_dirs().expect("dirs");
        std::fs::write(
            paths.settings_path(),
            r#"{ "audio_codec": "opus", "cookies_from_browser": null }"#,
        )
        .expect("write");

        let settings = load_download_settings(&paths).expect("load");
        assert_eq!(settings.audio_codec, "opus");
        assert_eq!(settings.cookies_from_browser, None);
        assert_eq!(settings.audio_quality, "5");
        assert_eq!(settings.thumbnail_format, "jpg");
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        let settings = DownloadSettings {
            yt_dlp_path: Some("/opt/yt-dlp".to_string()),
            overwrite: true,
            ..DownloadSettings::default()
        };

        save_download_settings(&paths, &settings).expect("save");
        let raw = std::fs::read_to_string(paths.settings_path()).expect("read");
        assert!(raw.ends_with("}\n"));
        assert_eq!(load_download_settings(&paths).expect("load"), settings);
    }

    #[test]
    fn malformed_settings_file_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());
        paths.ensure_dirs().expect("dirs");
        std::fs::write(paths.settings_path(), "{ not json").expect("write");

        match load_download_settings(&paths) {
            Err(EngineError::SettingsInvalid { path, .. }) => {
                assert_eq!(path, paths.settings_path())
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
