pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::domain::model::Metric;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "area-flow")]
#[command(about = "Aggregate documents over areas and groups and simulate group moves")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "area-flow.toml")]
    pub config: String,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Only produce outputs for this metric
    #[arg(long, value_enum)]
    pub metric: Option<Metric>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Show what would be computed without reading or writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn apply(&self, config: &mut toml_config::TomlConfig) {
        if let Some(output) = &self.output {
            tracing::info!("Output path overridden to: {}", output);
            config.set_output_path(output.clone());
        }
        if let Some(metric) = self.metric {
            tracing::info!("Metrics restricted to: {}", metric);
            config.restrict_metrics(metric);
        }
    }
}
