use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Application paths following OS conventions
#[derive(Clone, Debug)]
pub struct AppPaths {
    /// Configuration directory (config.toml)
    pub config: PathBuf,
    /// Data directory (session.toml)
    pub data: PathBuf,
}

impl AppPaths {
    /// Resolve OS-specific paths for VoxSecure
    ///
    /// # Platform Paths
    ///
    /// ## Linux
    /// - Config: `~/.config/voxsecure/`
    /// - Data: `~/.local/share/voxsecure/`
    ///
    /// ## macOS
    /// - Config: `~/Library/Preferences/com.VoxSecure.VoxSecure/`
    /// - Data: `~/Library/Application Support/com.VoxSecure.VoxSecure/`
    ///
    /// ## Windows
    /// - Config: `%APPDATA%\VoxSecure\VoxSecure\config\`
    /// - Data: `%APPDATA%\VoxSecure\VoxSecure\data\`
    pub fn new() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("com", "VoxSecure", "VoxSecure")
            .context("Failed to determine project directories")?;

        Ok(Self {
            config: proj_dirs.config_dir().to_path_buf(),
            data: proj_dirs.data_dir().to_path_buf(),
        })
    }

    /// Paths rooted at an explicit directory (portable installs, tests)
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config: root.join("config"),
            data: root.join("data"),
        }
    }

    /// Create all necessary directories
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.config).context("Failed to create config directory")?;
        fs::create_dir_all(&self.data).context("Failed to create data directory")?;

        log::info!("Application directories initialized");
        log::debug!("  Config: {}", self.config.display());
        log::debug!("  Data:   {}", self.data.display());

        Ok(())
    }

    /// Get path to config file
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Get path to the persisted login session
    pub fn session_file(&self) -> PathBuf {
        self.data.join("session.toml")
    }
}
