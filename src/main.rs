use anyhow::Context;
use area_flow::config::toml_config::SourceKind;
use area_flow::core::{ConfigProvider, RecordSource};
use area_flow::utils::error::ErrorSeverity;
use area_flow::utils::{logger, validation::Validate};
use area_flow::{
    AreaPipeline, CliConfig, FileSource, FlowError, HttpSource, LocalStorage, StatsEngine,
    TomlConfig,
};
use clap::Parser;
use std::collections::HashMap;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Loading configuration from: {}", args.config);
    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;
    args.apply(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("Dry run, nothing is read or written");
        return Ok(());
    }

    let result = match config.source.r#type {
        SourceKind::Http => {
            let source = HttpSource::with_options(
                &config.source.endpoint,
                &config.source.units_path,
                &config.source.items_path,
                config.source.timeout_seconds.map(Duration::from_secs),
                config.source.headers.clone().unwrap_or_else(HashMap::new),
            );
            match source {
                Ok(source) => run(source, config).await,
                Err(e) => Err(e),
            }
        }
        SourceKind::File => {
            let storage = LocalStorage::new(config.source.endpoint.clone());
            let units_path = config.source.units_path.clone();
            let items_path = config.source.items_path.clone();
            run(FileSource::new(storage, units_path, items_path), config).await
        }
    };

    match result {
        Ok(output_path) => {
            tracing::info!("Area statistics written to: {}", output_path);
            println!("✅ Area statistics written to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run<R: RecordSource>(source: R, config: TomlConfig) -> Result<String, FlowError> {
    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = AreaPipeline::new(source, storage, config);
    StatsEngine::new(pipeline).run().await
}

fn display_config_summary(config: &TomlConfig) {
    println!("📋 Configuration Summary:");
    println!("  Source: {:?} {}", config.source.r#type, config.source.endpoint);
    println!("  Window: {}", config.window().description());
    println!(
        "  Metrics: {}",
        config
            .metrics()
            .iter()
            .map(|metric| metric.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Remapping rules: {}", config.remapping().len());
    for rule in config.remapping().rules() {
        println!("    {} -> {}", rule.group, rule.target);
    }
    println!("  Output: {} ({})", config.output_path(), config.output_formats().join(", "));
    println!();
}
