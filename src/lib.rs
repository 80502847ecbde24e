pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod manager;
pub mod query;
pub mod schema;

use crate::cli::output::{format_entity, format_listing, print_skipped};
pub use cli::{Cli, Commands, OutputFormat, cli_parse};
pub use config::{ClientConfig, ConfigError, ConnectionConfig, load_config};
pub use error::{ODataError, ValidationError};
pub use filter::{FilterError, Q, Value, and, not, or};
pub use http::{Connection, HttpGateway, HttpResponse, Method, with_connection};
pub use manager::{EntityManager, Listing};
pub use query::{QueryParams, QuerySpec, compile_query};
pub use schema::{EntityDescriptor, FieldMapping, RawEntity};

use anyhow::Context;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build the AND of all `-w key=value` lookups, if any
fn build_filter(lookups: &[String]) -> anyhow::Result<Option<Q>> {
    if lookups.is_empty() {
        return Ok(None);
    }
    let pairs = lookups
        .iter()
        .map(|arg| cli::parse_lookup_arg(arg))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Q::lookups(pairs)?))
}

/// Parse a `--data` argument into a JSON object
fn parse_body(data: &str) -> anyhow::Result<RawEntity> {
    let value: serde_json::Value =
        json5::from_str(data).map_err(|e| anyhow::anyhow!("Invalid JSON: {}", e))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("Entity data must be a JSON object, got: {}", other),
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = cli_parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref()).context("Failed to load config")?;
    cli.apply_overrides(&mut config.connection);
    let format = cli.format;

    match &cli.command {
        Commands::Query {
            entity,
            lookups,
            top,
        } => {
            let descriptor = config.descriptor::<RawEntity>(entity)?;
            let spec = QuerySpec::for_mapping(descriptor.mapping())
                .with_filter(build_filter(lookups)?)
                .with_top(*top);
            let params = QueryParams::compile(&spec, descriptor.mapping())?;
            let url = format!("{}{}", descriptor.entity_name(), params.encode());

            match format {
                OutputFormat::Table => println!("{url}"),
                OutputFormat::Json => {
                    let decoded: serde_json::Map<String, serde_json::Value> = params
                        .pairs()
                        .iter()
                        .map(|(key, value)| (key.to_string(), json!(value)))
                        .collect();
                    let output = json!({ "url": url, "params": decoded });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
        }
        Commands::List {
            entity,
            lookups,
            top,
            lenient,
        } => {
            let descriptor = config.descriptor::<RawEntity>(entity)?;
            let filter = build_filter(lookups)?;
            config.connection.validate()?;

            let listing = with_connection(&config.connection, |connection| {
                let mut manager = EntityManager::new(&descriptor, connection);
                if let Some(filter) = filter {
                    manager.filter(filter);
                }
                if let Some(top) = top {
                    manager.top(*top);
                }
                manager.all(*lenient)
            })?;

            println!("{}", format_listing(&listing, format));
            print_skipped(&listing.invalid);
        }
        Commands::Get { entity, guid } => {
            let descriptor = config.descriptor::<RawEntity>(entity)?;
            config.connection.validate()?;

            let item = with_connection(&config.connection, |connection| {
                EntityManager::new(&descriptor, connection).get(guid)
            })?;
            println!("{}", format_entity(&item, format));
        }
        Commands::Create { entity, data } => {
            let descriptor = config.descriptor::<RawEntity>(entity)?;
            let body = parse_body(data)?;
            config.connection.validate()?;

            let created = with_connection(&config.connection, |connection| {
                EntityManager::new(&descriptor, connection).create(&body)
            })?;
            println!("{}", format_entity(&created, format));
        }
        Commands::Update { entity, guid, data } => {
            let descriptor = config.descriptor::<RawEntity>(entity)?;
            let body = parse_body(data)?;
            config.connection.validate()?;

            let updated = with_connection(&config.connection, |connection| {
                EntityManager::new(&descriptor, connection).update(guid, &body)
            })?;
            println!("{}", format_entity(&updated, format));
        }
        Commands::Delete { entity, guid } => {
            let descriptor = config.descriptor::<RawEntity>(entity)?;
            config.connection.validate()?;

            with_connection(&config.connection, |connection| {
                EntityManager::new(&descriptor, connection).delete(guid)
            })?;
            println!("{} {} deleted.", descriptor.entity_name(), guid);
        }
    }

    Ok(())
}
