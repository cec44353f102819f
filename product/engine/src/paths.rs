use std::path::{Path, PathBuf};

const BASE_DIR_ENV_VAR: &str = "YTMAD_BASE_DIR";
const APP_DIR_NAME: &str = "ytmad";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_dir: PathBuf,
}

impl AppPaths {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Resolves the per-user app directory: `YTMAD_BASE_DIR` first, then the
    /// platform config location.
    pub fn default_base_dir() -> Option<PathBuf> {
        if let Ok(v) = std::env::var(BASE_DIR_ENV_VAR) {
            let t = v.trim();
            if !t.is_empty() {
                return Some(PathBuf::from(t));
            }
        }

        if cfg!(windows) {
            if let Ok(appdata) = std::env::var("APPDATA") {
                let t = appdata.trim();
                if !t.is_empty() {
                    return Some(PathBuf::from(t).join(APP_DIR_NAME));
                }
            }
            return None;
        }

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            let t = xdg.trim();
            if !t.is_empty() {
                return Some(PathBuf::from(t).join(APP_DIR_NAME));
            }
        }
        std::env::var("HOME")
            .ok()
            .map(|home| home.trim().to_string())
            .filter(|home| !home.is_empty())
            .map(|home| PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base_dir.join("config")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir().join("settings.json")
    }

    pub fn output_dir_override_path(&self) -> PathBuf {
        self.config_dir().join("output_dir.txt")
    }

    pub fn output_dir_override(&self) -> std::io::Result<Option<PathBuf>> {
        let path = self.output_dir_override_path();
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        Ok(Some(PathBuf::from(trimmed)))
    }

    pub fn set_output_dir_override(&self, dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(self.config_dir())?;
        std::fs::write(
            self.output_dir_override_path(),
            format!("{}\n", dir.to_string_lossy()),
        )?;
        Ok(())
    }

    pub fn clear_output_dir_override(&self) -> std::io::Result<()> {
        let path = self.output_dir_override_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.base_dir.join("tools")
    }

    pub fn bundled_yt_dlp_path(&self) -> PathBuf {
        let mut path = self.tools_dir().join("yt-dlp").join("yt-dlp");
        if cfg!(windows) {
            path.set_extension("exe");
        }
        path
    }

    pub fn bundled_ffmpeg_path(&self) -> PathBuf {
        let mut path = self.tools_dir().join("ffmpeg").join("ffmpeg");
        if cfg!(windows) {
            path.set_extension("exe");
        }
        path
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.config_dir())?;
        std::fs::create_dir_all(self.tools_dir())?;
        Ok(())
    }
}
