//! Hubtable CLI - query GitHub resources as tables.

mod commands;
mod config;
mod output;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hubtable::table::Qual;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "hubtable")]
#[command(version)]
#[command(about = "Query GitHub resources as tables")]
#[command(
    long_about = "Hubtable exposes GitHub repositories, issues, stargazers, packages, \
deployments, organization members and rate limits as tables. Only the columns you \
ask for are fetched from the API."
)]
#[command(after_long_help = r#"EXAMPLES
    List the tables:
        $ hubtable tables

    Show the columns of a table:
        $ hubtable columns github_issue

    Open issues of a repository, newest first:
        $ hubtable query github_issue -w repository_full_name=rust-lang/rust -w state=open \
            -c number -c title -c author_login -l 20

    Search repositories and print JSON:
        $ hubtable query github_search_repository -w "query=language:rust stars:>1000" -o json

    Fetch one repository:
        $ hubtable get github_repository -w full_name=rust-lang/cargo

    Generate shell completions:
        $ hubtable completions bash > ~/.local/share/bash-completion/completions/hubtable

CONFIGURATION
    Hubtable reads configuration from:
      1. ~/.config/hubtable/config.toml (or $XDG_CONFIG_HOME/hubtable/config.toml)
      2. ./hubtable.toml
      3. Environment variables (HUBTABLE_* prefix, e.g., HUBTABLE_GITHUB__TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    HUBTABLE_GITHUB__TOKEN      GitHub token (GITHUB_TOKEN is used as a fallback)
    HUBTABLE_GITHUB__BASE_URL   REST API root (default: https://api.github.com)
    RUST_LOG                    Log filter (default: hubtable=info,hubtable_cli=info)
"#)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available tables
    Tables {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List the columns of a table
    Columns {
        /// Table name, e.g. github_issue
        table: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Scan a table
    Query {
        /// Table name, e.g. github_issue
        table: String,

        #[command(flatten)]
        opts: QueryOptions,

        /// Maximum number of rows (default from config, otherwise unlimited)
        #[arg(short, long)]
        limit: Option<u64>,
    },
    /// Fetch a single row by its key columns
    Get {
        /// Table name, e.g. github_repository
        table: String,

        #[command(flatten)]
        opts: QueryOptions,
    },
    /// Show current rate limit status
    Limits {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Options shared by `query` and `get`.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct QueryOptions {
    /// Column to return; repeat for more (default: every column)
    #[arg(short = 'c', long = "column")]
    pub columns: Vec<String>,

    /// Qualifier such as `repository_full_name=owner/repo`; repeat for more
    #[arg(short = 'w', long = "where")]
    pub quals: Vec<Qual>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Disable proactive rate limiting (may cause API throttling)
    #[arg(short = 'R', long)]
    pub no_rate_limit: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("hubtable=info,hubtable_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that need neither configuration nor the network.
    match &cli.command {
        Commands::Tables { output } => {
            commands::catalog::handle_tables(*output)?;
            return Ok(());
        }
        Commands::Columns { table, output } => {
            commands::catalog::handle_columns(table, *output)?;
            return Ok(());
        }
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    let config = config::Config::load();

    match cli.command {
        Commands::Query { table, opts, limit } => {
            commands::query::handle_query(&table, opts, limit, &config).await?;
        }
        Commands::Get { table, opts } => {
            commands::query::handle_get(&table, opts, &config).await?;
        }
        Commands::Limits { output } => {
            commands::limits::handle_limits(output, &config).await?;
        }
        Commands::Tables { .. }
        | Commands::Columns { .. }
        | Commands::Completions { .. }
        | Commands::Man { .. } => {}
    }

    Ok(())
}
