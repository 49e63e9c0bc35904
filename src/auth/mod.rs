pub mod services;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ForgeError, Result};
use services::Service;

/// On-disk representation of auth.json
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
pub struct AuthStore {
    #[serde(default)]
    pub credentials: HashMap<String, Credential>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Credential {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AuthStore {
    /// Path to auth.json
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ForgeError::Auth("Could not determine config directory".into()))?;
        Ok(config_dir.join("contextforge").join("auth.json"))
    }

    /// Load from the default location, returning default if the file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let store: AuthStore = serde_json::from_str(&data)?;
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Save with 0600 permissions
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, &data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn get(&self, service: Service) -> Option<&Credential> {
        self.credentials.get(&service.to_string())
    }

    pub fn set(&mut self, service: Service, cred: Credential) {
        self.credentials.insert(service.to_string(), cred);
    }

    pub fn remove(&mut self, service: Service) -> bool {
        self.credentials.remove(&service.to_string()).is_some()
    }
}

/// Mask a secret for display, keeping the first and last four characters
pub fn mask_secret(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}
