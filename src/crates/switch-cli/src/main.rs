//! # dynswitch
//!
//! Routes JSON records through a dynamic switch node definition and prints
//! the resulting channels.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use switch_engine::config::{lint_rules, ENV_PREFIX};
use switch_engine::{
    NodeDefinition, NodeExecutor, Record, RoutingConfig, StaticHost, SwitchNode, SwitchSettings,
};
use tooling::config::ConfigBuilder;
use tooling::logging::{init_logging, LogGuard, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "dynswitch")]
#[command(about = "Route JSON records into numbered output channels", long_about = None)]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML settings file; `DYNSWITCH_*` environment variables take precedence
    #[arg(long, global = true, env = "DYNSWITCH_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Route a batch of records and print the channels as JSON
    Route {
        /// Path to the YAML node definition
        definition: PathBuf,

        /// JSON file with the input records, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Turn failing records into diagnostics on channel 0
        #[arg(long)]
        continue_on_fail: bool,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Check a node definition's rules without routing anything
    Validate {
        /// Path to the YAML node definition
        definition: PathBuf,
    },

    /// Print the resolved channel labels
    Labels {
        /// Path to the YAML node definition
        definition: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref(), cli.verbose)?;
    init_logging(&settings.logging()).context("Failed to initialise logging")?;

    match cli.command {
        Commands::Route {
            definition,
            input,
            continue_on_fail,
            pretty,
        } => {
            let records = read_records(&input)?;
            tracing::debug!("Read {} records from {}", records.len(), input);
            let output =
                route_command(&definition, records, &settings, continue_on_fail, pretty).await?;
            println!("{}", output);
        }
        Commands::Validate { definition } => {
            let report = validate_command(&definition, &settings)?;
            println!("{}", report);
        }
        Commands::Labels { definition } => {
            for line in labels_command(&definition, &settings)? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Layer settings: environment over the settings file over defaults
fn load_settings(file: Option<&Path>, verbose: u8) -> Result<SwitchSettings> {
    let mut settings =
        SwitchSettings::from_env(ENV_PREFIX).context("Invalid DYNSWITCH_* environment")?;

    let base = match file {
        Some(path) => SwitchSettings::from_toml_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => SwitchSettings::default(),
    };
    settings.merge(base);

    match verbose {
        0 => {}
        1 => settings.log_level = Some("debug".to_string()),
        _ => settings.log_level = Some("trace".to_string()),
    }

    settings.validate()?;
    Ok(settings)
}

fn load_definition(path: &Path) -> Result<NodeDefinition> {
    NodeDefinition::from_yaml_file(path)
        .with_context(|| format!("Failed to load node definition {}", path.display()))
}

fn read_records(input: &str) -> Result<Vec<Record>> {
    let content = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read records from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read records from {}", input))?
    };

    parse_records(&content)
}

/// Parse input records; non-object values are wrapped as `{ "value": v }`
fn parse_records(content: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(content).context("Input is not valid JSON")?;

    let payloads = match value {
        Value::Array(values) => values,
        single => vec![single],
    };

    Ok(Record::batch(payloads.into_iter().map(|payload| match payload {
        Value::Object(_) => payload,
        bare => serde_json::json!({ "value": bare }),
    })))
}

async fn route_command(
    definition_path: &Path,
    records: Vec<Record>,
    settings: &SwitchSettings,
    continue_on_fail: bool,
    pretty: bool,
) -> Result<String> {
    let _guard = LogGuard::with_level("dynswitch route", LogLevel::Info);

    let mut definition = load_definition(definition_path)?;
    if continue_on_fail {
        definition.continue_on_fail = Some(true);
    }

    let host = StaticHost::from_definition(&definition, settings).with_items(&records);
    let channels = SwitchNode::new().execute(records, &host).await?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&channels)?
    } else {
        serde_json::to_string(&channels)?
    };
    Ok(rendered)
}

fn validate_command(definition_path: &Path, settings: &SwitchSettings) -> Result<String> {
    let definition = load_definition(definition_path)?;
    let host = StaticHost::from_definition(&definition, settings);
    let (config, issues) = lint_rules(&host)?;

    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  ✗ {}", issue);
        }
        bail!(
            "{}: {} issue(s) found in '{}'",
            definition_path.display(),
            issues.len(),
            config.node_name()
        );
    }

    Ok(format!(
        "✓ {}: '{}' is valid ({:?} mode, {} channels)",
        definition_path.display(),
        config.node_name(),
        config.mode(),
        config.channel_count()
    ))
}

fn labels_command(definition_path: &Path, settings: &SwitchSettings) -> Result<Vec<String>> {
    let definition = load_definition(definition_path)?;
    let host = StaticHost::from_definition(&definition, settings);
    let config = RoutingConfig::resolve(&host)?;

    Ok(config
        .labels()
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}\t{}", i, label))
        .collect())
}
