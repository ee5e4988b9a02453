use crate::error::{ReaderError, Result};
use crate::models::config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_DIR: &str = "raid-results-reader";
const CONFIG_FILE: &str = "config.json";

/// Configuration manager for reader settings
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the platform config location
    /// (`~/.config/raid-results-reader/config.json` on Linux)
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ReaderError::Config("Failed to determine config directory".to_string()))?
            .join(APP_DIR);

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE),
            config_dir,
        })
    }

    /// Manager for an explicit config file
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        let config_path = path.as_ref().to_path_buf();
        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            config_dir,
            config_path,
        }
    }

    /// Save configuration to disk
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if !self.config_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.config_dir)?;
        }

        // Pretty print for human editing
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, json)?;

        info!("Saved config to {:?}", self.config_path);
        Ok(())
    }

    /// Load configuration from disk
    ///
    /// If config file doesn't exist, returns default configuration
    pub fn load(&self) -> Result<AppConfig> {
        if !self.config_exists() {
            debug!("No config at {:?}, using defaults", self.config_path);
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_path)?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| ReaderError::Config(format!("Failed to parse {:?}: {}", self.config_path, e)))?;

        debug!("Loaded config from {:?}", self.config_path);
        Ok(config)
    }

    /// Get the config file path
    pub fn config_file_path(&self) -> &Path {
        &self.config_path
    }

    /// Check if config file exists
    pub fn config_exists(&self) -> bool {
        self.config_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a temporary test config manager
    fn create_test_manager() -> ConfigManager {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let temp_dir = std::env::temp_dir().join(format!("raid-reader-test-{}-{}", std::process::id(), id));
        let _ = fs::remove_dir_all(&temp_dir);

        ConfigManager::with_path(temp_dir.join(CONFIG_FILE))
    }

    fn cleanup_test_files(manager: &ConfigManager) {
        let _ = fs::remove_dir_all(&manager.config_dir);
    }

    #[test]
    fn test_platform_path() {
        // No config dir at all is possible in bare CI environments
        if let Ok(manager) = ConfigManager::new() {
            assert!(manager.config_file_path().ends_with(Path::new(APP_DIR).join(CONFIG_FILE)));
        }
    }

    #[test]
    fn test_config_load_default_when_not_exists() {
        let manager = create_test_manager();

        assert!(!manager.config_exists());
        let config = manager.load().expect("load should fall back to defaults");
        assert_eq!(config, AppConfig::default());

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_save_and_load() {
        let manager = create_test_manager();

        let mut config = AppConfig::default();
        config.ocr.base_url = "http://10.0.0.2:9000".to_string();
        config.segmentation.reject_color = [200, 40, 40];
        config.menu.center_tolerance = 0.15;

        manager.save(&config).expect("save should succeed");
        assert!(manager.config_exists(), "Config file should exist after save");

        let loaded = manager.load().expect("load should succeed");
        assert_eq!(loaded, config);

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_config_overwrite() {
        let manager = create_test_manager();

        let mut first = AppConfig::default();
        first.rows.spacing_factor = 0.5;
        manager.save(&first).unwrap();

        let mut second = AppConfig::default();
        second.rows.spacing_factor = 0.9;
        manager.save(&second).unwrap();

        assert_eq!(manager.load().unwrap().rows.spacing_factor, 0.9);

        cleanup_test_files(&manager);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let manager = create_test_manager();
        fs::create_dir_all(&manager.config_dir).unwrap();
        fs::write(&manager.config_path, "{ not json").unwrap();

        assert!(matches!(manager.load(), Err(ReaderError::Config(_))));

        cleanup_test_files(&manager);
    }
}
