use crate::core::aggregator::AggregateOptions;
use crate::core::remapping::{DuplicatePolicy, Remapping};
use crate::core::window::{Window, WindowBasis};
use crate::core::ConfigProvider;
use crate::domain::model::Metric;
use crate::utils::error::{FlowError, Result};
use crate::utils::validation::{self, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub aggregate: AggregateOptions,
    #[serde(default)]
    pub reallocate: ReallocateConfig,
    /// Inline rules, group = "new area".
    #[serde(default)]
    pub remapping: BTreeMap<String, String>,
    pub output: OutputConfig,
    #[serde(skip)]
    resolved_remapping: Remapping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Http,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: SourceKind,
    /// Base URL for `http`, base directory for `file`.
    pub endpoint: String,
    #[serde(default = "default_units_path")]
    pub units_path: String,
    #[serde(default = "default_items_path")]
    pub items_path: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

fn default_units_path() -> String {
    "units.json".to_string()
}

fn default_items_path() -> String {
    "items.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub basis: WindowBasis,
    /// Lookback in days; no lookback when absent.
    pub days: Option<i64>,
    /// Instant the lookback is measured from; the current time when absent.
    pub reference: Option<DateTime<Utc>>,
    pub exclude_states: Vec<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            basis: WindowBasis::Approved,
            days: Some(3 * 365),
            reference: None,
            exclude_states: Vec::new(),
        }
    }
}

impl WindowConfig {
    pub fn to_window(&self) -> Window {
        let window = match self.days {
            Some(days) => {
                Window::lookback(self.basis, days, self.reference.unwrap_or_else(Utc::now))
            }
            None => Window::all(),
        };
        window.excluding_states(self.exclude_states.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReallocateConfig {
    pub metrics: Vec<Metric>,
    pub duplicates: DuplicatePolicy,
    /// CSV of `group,target` rows, relative to the config file.
    pub remapping_file: Option<String>,
}

impl Default for ReallocateConfig {
    fn default() -> Self {
        Self {
            metrics: Metric::ALL.to_vec(),
            duplicates: DuplicatePolicy::default(),
            remapping_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
}

fn default_formats() -> Vec<String> {
    vec!["csv".to_string(), "json".to_string()]
}

impl TomlConfig {
    /// Loads the file, then any `reallocate.remapping_file` next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml_str(&content)?;

        if let Some(file) = config.reallocate.remapping_file.clone() {
            let base = path.as_ref().parent().unwrap_or_else(|| Path::new("."));
            let data = std::fs::read(base.join(&file))?;
            let from_file = Remapping::from_csv(&data, config.reallocate.duplicates)?;
            config
                .resolved_remapping
                .extend(from_file, config.reallocate.duplicates)?;
        }

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| FlowError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.resolved_remapping = Remapping::from_pairs(
            config.remapping.clone(),
            config.reallocate.duplicates,
        )?;
        Ok(config)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| FlowError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        match self.source.r#type {
            SourceKind::Http => validation::validate_url("source.endpoint", &self.source.endpoint)?,
            SourceKind::File => validation::validate_path("source.endpoint", &self.source.endpoint)?,
        }
        validation::validate_path("source.units_path", &self.source.units_path)?;
        validation::validate_path("source.items_path", &self.source.items_path)?;
        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_allowed_values("output.formats", &self.output.formats, &["csv", "json"])?;
        validation::validate_non_empty("reallocate.metrics", &self.reallocate.metrics)?;

        if let Some(days) = self.window.days {
            validation::validate_positive_number("window.days", days, 1)?;
        }
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_positive_number("source.timeout_seconds", timeout as i64, 1)?;
        }

        Ok(())
    }

    pub fn set_output_path(&mut self, path: String) {
        self.output.path = path;
    }

    pub fn restrict_metrics(&mut self, metric: Metric) {
        self.reallocate.metrics = vec![metric];
    }
}

impl ConfigProvider for TomlConfig {
    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn metrics(&self) -> &[Metric] {
        &self.reallocate.metrics
    }

    fn window(&self) -> Window {
        self.window.to_window()
    }

    fn aggregate_options(&self) -> &AggregateOptions {
        &self.aggregate
    }

    fn remapping(&self) -> &Remapping {
        &self.resolved_remapping
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
