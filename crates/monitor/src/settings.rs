//! Layered monitor configuration

use alerting::AlarmConfig;
use camera_capture::CaptureConfig;
use config::{Config, Environment, File};
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::MonitorError;

/// Environment variable prefix, e.g. `DROWSY_DMS__EAR_THRESHOLD=0.22`
pub const ENV_PREFIX: &str = "DROWSY";

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub capture: CaptureConfig,
    pub dms: DmsConfig,
    pub alarm: AlarmConfig,
    /// Annotated frames are written here when set
    pub output_dir: Option<PathBuf>,
}

impl MonitorConfig {
    /// Load defaults, then the optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        }

        let config: MonitorConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }
}
