//! Engine configuration.
//!
//! Loaded from an optional TOML file with environment variables on top
//! (highest priority), prefix `DENORM`, `__` as the section separator:
//! `DENORM_DISPATCH__MODE=inline` overrides `[dispatch] mode`.


use config::Config;
use config::Environment;
use config::File;
use config::FileFormat;
use serde::Deserialize;

use crate::constants::ENV_PREFIX;
use crate::DispatchMode;
use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Dispatch scheduling parameters
    #[serde(default)]
    pub dispatch: DispatchSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchSettings {
    /// Deferred (production) or inline (deterministic) cycle execution
    #[serde(default)]
    pub mode: DispatchMode,

    /// Deferred cycles allowed in flight before new ones run inline as
    /// backpressure (0 = unlimited)
    #[serde(default)]
    pub max_in_flight: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            max_in_flight: 0,
        }
    }
}

impl Settings {
    /// Loads configuration with priority: defaults, then `path` (when
    /// given), then environment variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
