//! CLI configuration: the library config plus a static profile list

use std::path::Path;

use agenda::{AgendaConfig, PermissionProfile, StaticDirectory};
use anyhow::{Context, Result};
use serde::Deserialize;

/// Contents of the `--config` TOML file.
///
/// ```toml
/// [decision]
/// min_reason_length = 10
///
/// [[profiles]]
/// user_id = "mgr-1"
/// permission_level = 7.0
/// facility_id = "fac-1"
/// department = "nursing"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub agenda: AgendaConfig,
    #[serde(default)]
    pub profiles: Vec<PermissionProfile>,
}

impl CliConfig {
    /// Read `path` if given, otherwise start from defaults. Env overrides
    /// apply either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str::<CliConfig>(&content)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => CliConfig::default(),
        };
        config.agenda = config
            .agenda
            .with_env_overrides()
            .context("Invalid AGENDA_* environment override")?;
        config.agenda.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn directory(&self) -> StaticDirectory {
        StaticDirectory::new(self.profiles.iter().cloned())
    }
}
