//! YAML configuration file.
//!
//! ```yaml
//! fetch:
//!   zoom: 15
//!   cache_capacity: 1024
//!   eviction: least_recently_used
//!   sources:
//!     - name: dem5a
//!       url: https://cyberjapandata.gsi.go.jp/xyz/dem5a_png/{z}/{x}/{y}.png
//! analysis:
//!   max_points: 100000
//!   timeout_secs: 30
//! ```
//!
//! Every field is optional; missing fields take the library defaults.

use crate::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use terraslope_analysis::AnalysisConfig;
use terraslope_dem::FetchConfig;

/// Complete configuration of the `terraslope` binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerraslopeConfig {
    /// Tile fetching.
    pub fetch: FetchConfig,
    /// Analysis policy.
    pub analysis: AnalysisConfig,
}

impl TerraslopeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| CliError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), strip_prefix(&e))))
    }

    /// Load a file if one is given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Check for values the fetcher or analyzer cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.fetch
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.fetch.sources.is_empty() {
            return Err(CliError::Config("at least one elevation source is required".into()));
        }
        if self.analysis.max_points == 0 {
            return Err(CliError::Config("analysis.max_points must be positive".into()));
        }
        if self.analysis.cross_section_samples == 0 {
            return Err(CliError::Config(
                "analysis.cross_section_samples must be positive".into(),
            ));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(CliError::Config("analysis.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| CliError::Encode(e.to_string()))
    }
}

fn strip_prefix(error: &CliError) -> String {
    match error {
        CliError::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}
