use anyhow::Context;
use std::path::{Path, PathBuf};
use voztask_core::config::AppConfig;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<AppConfig> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read config: {}", self.path.display()))?;
        let cfg: AppConfig = serde_json::from_slice(&bytes).context("decode config JSON")?;
        Ok(cfg)
    }

    /// First run has no config file; that is not an error.
    pub fn load_or_default(&self) -> AppConfig {
        self.load().unwrap_or_else(|e| {
            log::debug!("using default config: {e:#}");
            AppConfig::default()
        })
    }

    pub fn save(&self, cfg: &AppConfig) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(cfg).context("encode config JSON")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create config directory: {}", parent.display()))?;
        }

        // Atomic-ish write: write temp then replace.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("write temp: {}", tmp.display()))?;
        replace_file(&tmp, &self.path)
            .with_context(|| format!("replace file: {}", self.path.display()))?;
        Ok(())
    }
}

fn replace_file(tmp: &Path, dst: &Path) -> std::io::Result<()> {
    // Windows refuses to rename over an existing file.
    #[cfg(windows)]
    if dst.exists() {
        std::fs::remove_file(dst)?;
    }
    std::fs::rename(tmp, dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::at_path(path);

        let cfg = AppConfig {
            backend_base_url: "http://tasks.local:5000".into(),
            microphone_device: Some("USB Microphone".into()),
            capture: Default::default(),
        };

        store.save(&cfg).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at_path(dir.path().join("missing.json"));

        assert!(store.load().is_err());
        let cfg = store.load_or_default();
        assert_eq!(cfg, AppConfig::default());
    }
}
