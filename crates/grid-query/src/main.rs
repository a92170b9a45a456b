//! grid-query command-line tool.
//!
//! Compiles a grid request JSON document against a schema file and either
//! prints the SQL or runs it against PostgreSQL.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use grid_query::config::Config;
use grid_query::grid::{ALL_COLUMNS, GridOutcome, GridQueryBuilder, GridRequest, PgRowSource};
use grid_query::schema::{SchemaRegistry, load_schema};
use sea_query::PostgresQueryBuilder;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Schema file (overrides GRID_SCHEMA_PATH).
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the page, count and value listing SQL without connecting.
    Compile(RequestArgs),
    /// Run the request and print the page with its total.
    Rows {
        #[command(flatten)]
        request: RequestArgs,

        /// Number rows with `__index`.
        #[arg(long)]
        index: bool,
    },
    /// Run the count query only.
    Count(RequestArgs),
    /// List distinct values of the request's `column`.
    Values {
        #[command(flatten)]
        request: RequestArgs,

        /// Column allowed for value listings; repeatable, `*` allows all.
        #[arg(long = "allow", required = true)]
        allowed: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Entity to query.
    #[arg(long)]
    entity: String,

    /// Request JSON file; `-` reads stdin.
    #[arg(long, default_value = "-")]
    request: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let schema_path = cli.schema.unwrap_or_else(|| config.schema_path.clone());
    let registry = Arc::new(load_schema(&schema_path)?);

    match cli.command {
        Command::Compile(args) => {
            let builder = compile(&args, registry)?;
            println!("{}", builder.sql());
            println!("{}", builder.count_sql());
            if builder.request().column.is_some() {
                println!("{}", builder.distinct_sql(&[ALL_COLUMNS])?);
            }
        }
        Command::Rows { request, index } => {
            let mut builder = compile(&request, registry)?;
            if index {
                builder = builder.with_index_column();
            }
            let source = PgRowSource::connect(&config).await?;
            match builder.respond(&source).await? {
                GridOutcome::Rows(response) => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                GridOutcome::Export(handoff) => {
                    info!(file = %handoff.file_name(), "export requested");
                    let sql = handoff.query.select_statement().to_string(PostgresQueryBuilder);
                    println!("{sql}");
                }
            }
        }
        Command::Count(args) => {
            let builder = compile(&args, registry)?;
            let source = PgRowSource::connect(&config).await?;
            println!("{}", builder.count(&source).await?);
        }
        Command::Values { request, allowed } => {
            let builder = compile(&request, registry)?;
            let source = PgRowSource::connect(&config).await?;
            let allowed: Vec<&str> = allowed.iter().map(String::as_str).collect();
            let values = builder.distinct_values(&source, &allowed).await?;
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
    }

    Ok(())
}

fn compile(
    args: &RequestArgs,
    registry: Arc<SchemaRegistry>,
) -> Result<GridQueryBuilder> {
    let request = read_request(&args.request)?;
    GridQueryBuilder::for_entity(request, registry, &args.entity)
        .with_context(|| format!("failed to compile request for {}", args.entity))
}

fn read_request(path: &Path) -> Result<GridRequest> {
    let contents = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read request from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {}", path.display()))?
    };
    if contents.trim().is_empty() {
        bail!("request document is empty");
    }
    serde_json::from_str(&contents).context("request is not a valid grid request")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
