mod lookup_arg;
pub mod output;

use crate::config::ConnectionConfig;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
pub use lookup_arg::{parse_lookup_arg, parse_value};
use std::path::PathBuf;

/// Query and edit entities of an OData service
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML config file with connection settings and entity schemas
    #[arg(short = 'c', long, global = true, env = "ODATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Service base URL (overrides [connection] base_url)
    #[arg(long, global = true, env = "ODATA_BASE_URL")]
    pub base_url: Option<String>,

    /// Database path segment (overrides [connection] database)
    #[arg(long, global = true, env = "ODATA_DATABASE")]
    pub database: Option<String>,

    /// Basic auth user name
    #[arg(long, global = true, env = "ODATA_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password
    #[arg(long, global = true, env = "ODATA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(short = 'F', long, value_enum, global = true, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply command-line connection settings over the file values
    pub fn apply_overrides(&self, connection: &mut ConnectionConfig) {
        if let Some(base_url) = &self.base_url {
            connection.base_url = base_url.clone();
        }
        if let Some(database) = &self.database {
            connection.database = database.clone();
        }
        if let Some(username) = &self.username {
            connection.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            connection.password = Some(password.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the request URL for a collection query without sending it
    Query {
        /// Entity as configured under [entities]
        entity: String,

        /// Lookup such as width__gt=50 or ref__in__guid=[a, b]; repeatable, combined with AND
        #[arg(short = 'w', long = "where")]
        lookups: Vec<String>,

        /// Maximum number of entities
        #[arg(long)]
        top: Option<u32>,
    },
    /// Fetch a collection
    List {
        entity: String,

        #[arg(short = 'w', long = "where")]
        lookups: Vec<String>,

        #[arg(long)]
        top: Option<u32>,

        /// Skip items that fail validation instead of aborting
        #[arg(long)]
        lenient: bool,
    },
    /// Fetch one entity by guid
    Get { entity: String, guid: String },
    /// Create an entity from JSON (JSON5 accepted)
    Create {
        entity: String,

        #[arg(short, long)]
        data: String,
    },
    /// Patch an entity by guid
    Update {
        entity: String,
        guid: String,

        #[arg(short, long)]
        data: String,
    },
    /// Delete an entity by guid
    Delete { entity: String, guid: String },
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
