use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::workflow::{SolverType, DEFAULT_DIMENSION, HISTORY_CAPACITY};

/// Main configuration structure for the workbench
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Solving service connection
    pub solver: SolverConfig,
    /// Snapshot storage
    pub persistence: PersistenceConfig,
    /// Session defaults
    pub workflow: WorkflowDefaults,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

/// How the authorization matrix is written on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixEncoding {
    /// `true` / `false` cells
    #[default]
    Boolean,
    /// `1` / `0` cells, for services that bind the matrix to an int array
    Integer,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Service base URL, without the endpoint path
    pub base_url: String,
    pub solve_path: String,
    pub health_path: String,
    pub solvers_path: String,
    /// Request timeout
    pub timeout_secs: u64,
    /// Solver used when the caller does not pick one
    pub default_solver: SolverType,
    pub matrix_encoding: MatrixEncoding,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            solve_path: "/wsp/solve".to_string(),
            health_path: "/wsp/health".to_string(),
            solvers_path: "/wsp/solvers".to_string(),
            timeout_secs: 10,
            default_solver: SolverType::Sat,
            matrix_encoding: MatrixEncoding::Boolean,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Disable to keep everything in memory only
    pub enabled: bool,
    /// Directory holding one JSON file per storage key
    pub storage_dir: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_dir: PathBuf::from(".wsp-workbench"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowDefaults {
    /// Steps after a reset or on first start
    pub default_steps: usize,
    /// Users after a reset or on first start
    pub default_users: usize,
    /// Retained solve responses
    pub history_capacity: usize,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            default_steps: DEFAULT_DIMENSION,
            default_users: DEFAULT_DIMENSION,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl WorkbenchConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (wsp-workbench.toml, .wsp-workbench-rc)
    /// 3. Environment variables (prefixed with WSP_WORKBENCH, `__` between levels)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("wsp-workbench.toml").exists() {
            builder = builder.add_source(File::with_name("wsp-workbench"));
        }

        if Path::new(".wsp-workbench-rc").exists() {
            builder = builder.add_source(
                File::with_name(".wsp-workbench-rc").format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("WSP_WORKBENCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Process-wide read-only configuration
static CONFIG: std::sync::LazyLock<Result<WorkbenchConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = WorkbenchConfig::load_env_file();
        WorkbenchConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static WorkbenchConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}
