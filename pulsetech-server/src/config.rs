use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration loaded from YAML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub assets: AssetSettings,
    pub symptom_checker: SymptomCheckerSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub documents_db: String,
    pub audit_db: String,
}

/// Static asset directories served alongside the API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Front-end bundle; unmatched routes fall back to its index.html
    pub frontend_dir: PathBuf,
    /// Served under /image
    pub image_dir: PathBuf,
}

/// External symptom-checker subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SymptomCheckerSettings {
    pub command: String,
    pub args: Vec<String>,
    /// Optional working directory for the subprocess
    pub dir: Option<PathBuf>,
    /// How long to wait for output after writing an answer line. The
    /// subprocess gives no completion signal, so reads are delay-based.
    pub answer_delay_ms: u64,
    /// Upper bound on concurrently live sessions (each one is a
    /// subprocess); starts beyond the cap are refused.
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            documents_db: "documents.sqlite".to_string(),
            audit_db: "audit.sqlite".to_string(),
        }
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            frontend_dir: PathBuf::from("frontend"),
            image_dir: PathBuf::from("static/images"),
        }
    }
}

impl Default for SymptomCheckerSettings {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: vec!["symptom_checker.py".to_string()],
            dir: None,
            answer_delay_ms: 600,
            max_sessions: 16,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = if let Some(path) = config_path {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };

        // Override with environment variables
        if let Ok(port) = std::env::var("PULSETECH_PORT")
            && let Ok(port_num) = port.parse()
        {
            config.server.port = port_num;
        }

        if let Ok(host) = std::env::var("PULSETECH_HOST") {
            config.server.host = host;
        }

        if let Ok(data_dir) = std::env::var("PULSETECH_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        Ok(config)
    }

    /// Get the full path to the documents database
    pub fn documents_db_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.documents_db)
    }

    /// Get the full path to the audit database
    pub fn audit_db_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.audit_db)
    }
}
