//! Mapping command - inspect the item code mapping.

use clap::{Args, Subcommand};
use console::style;

use faktur_core::mapping::MappingFields;
use faktur_core::{normalize_code, HttpMappingSource, MappingCache, MappingLoad, SecondaryCode};

use super::load_config;

/// Arguments for the mapping command.
#[derive(Args)]
pub struct MappingArgs {
    /// Override the mapping source URL
    #[arg(long, global = true)]
    mapping_url: Option<String>,

    #[command(subcommand)]
    command: MappingCommand,
}

#[derive(Subcommand)]
enum MappingCommand {
    /// Fetch the mapping and list its entries
    Show {
        /// Show at most this many entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve item codes to secondary codes
    Lookup {
        /// Item codes (normalized before lookup)
        #[arg(required = true)]
        codes: Vec<String>,
    },
}

pub async fn run(args: MappingArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(url) = args.mapping_url {
        config.mapping.url = url;
    }

    let source = HttpMappingSource::from_config(&config.mapping)?;
    let cache = MappingCache::new(source)
        .with_fields(MappingFields::from(&config.mapping))
        .with_ttl(config.mapping.ttl());
    let load = cache.load().await;
    if let Some(warning) = &load.warning {
        anyhow::bail!("Failed to load mapping from {}: {}", config.mapping.url, warning);
    }

    match args.command {
        MappingCommand::Show { limit, json } => show(&load, limit, json),
        MappingCommand::Lookup { codes } => {
            lookup(&load, &codes);
            Ok(())
        }
    }
}

fn show(load: &MappingLoad, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let entries = load.table.sorted_entries();
    let shown = limit.unwrap_or(entries.len()).min(entries.len());

    if json {
        let map: serde_json::Map<String, serde_json::Value> = entries[..shown]
            .iter()
            .map(|(code, secondary)| (code.to_string(), serde_json::Value::from(*secondary)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!(
        "{} Mapping has {} item codes",
        style("ℹ").blue(),
        load.table.len()
    );
    for (code, secondary) in &entries[..shown] {
        println!("  {:<20} {}", code, secondary);
    }
    if shown < entries.len() {
        println!("  ... {} more", entries.len() - shown);
    }
    Ok(())
}

fn lookup(load: &MappingLoad, codes: &[String]) {
    for code in codes {
        let normalized = normalize_code(code);
        match load.table.resolve(&normalized) {
            SecondaryCode::Resolved(secondary) => {
                println!("{} {} -> {}", style("✓").green(), normalized, secondary)
            }
            SecondaryCode::NotFound => println!(
                "{} {} -> {}",
                style("✗").red(),
                normalized,
                SecondaryCode::NotFound
            ),
        }
    }
}
