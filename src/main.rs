// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use listing_insights::reports::{self, PriceQuery};
use listing_insights::{
    export_listings_csv, insert_listings, insert_reviews, load_listings_csv, load_reviews_csv,
    run_report, run_sql_report, setup_database, verify_count, GroupDimension, InsightsConfig,
    ReportKind, ReportParams, SqliteStore,
};

/// Analytics over a short-term rental listings dataset
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (default: <config dir>/listing-insights/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Listings CSV, overrides the config file
    #[arg(long, global = true)]
    listings: Option<PathBuf>,

    /// Reviews CSV, overrides the config file
    #[arg(long, global = true)]
    reviews: Option<PathBuf>,

    /// SQLite database, overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load the CSV files into a SQLite database
    Import,

    /// Print one report as JSON
    Report {
        /// Report name, e.g. revenue-by-area (use `list` to see all)
        name: String,

        /// Run the SQL variant against the database
        #[arg(long)]
        sql: bool,

        /// Grouping for ltm-reviews: room_type, neighbourhood, neighbourhood_group
        #[arg(long, default_value = "room_type")]
        dimension: String,

        /// First day counted by recent-neighbourhoods (YYYY-MM-DD)
        #[arg(long)]
        since: Option<chrono::NaiveDate>,

        /// Restrict cumulative-reviews to one listing
        #[arg(long)]
        listing_id: Option<i64>,
    },

    /// Suggest a nightly price for a neighbourhood and room type
    Suggest {
        #[arg(long)]
        neighbourhood: String,

        #[arg(long)]
        room_type: String,

        #[arg(long, default_value_t = 1)]
        bedrooms: i32,
    },

    /// Write the listings snapshot as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Interactive terminal dashboard (default)
    Ui,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command.unwrap_or(Command::Ui) {
        Command::Import => run_import(&config),
        Command::Report {
            name,
            sql,
            dimension,
            since,
            listing_id,
        } => run_report_command(&config, &name, sql, &dimension, since, listing_id),
        Command::Suggest {
            neighbourhood,
            room_type,
            bedrooms,
        } => run_suggest(
            &config,
            PriceQuery {
                neighbourhood,
                room_type,
                bedrooms,
            },
        ),
        Command::Export { out } => run_export(&config, out),
        Command::Ui => run_ui_mode(&config),
    }
}

fn resolve_config(cli: &Cli) -> Result<InsightsConfig> {
    let mut config = InsightsConfig::load(cli.config.as_deref())?;

    if let Some(path) = &cli.listings {
        config.listings_csv = path.clone();
    }
    if let Some(path) = &cli.reviews {
        config.reviews_csv = Some(path.clone());
    }
    if let Some(path) = &cli.db {
        config.database = Some(path.clone());
    }

    Ok(config)
}

fn run_import(config: &InsightsConfig) -> Result<()> {
    println!("🗄️  Import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = config
        .database
        .as_ref()
        .context("no database path: pass --db or set `database` in the config")?;

    // 1. Load CSVs
    println!("\n📂 Loading CSV...");
    let listings = load_listings_csv(&config.listings_csv)
        .with_context(|| format!("loading {}", config.listings_csv.display()))?;
    println!("✓ Loaded {} listings", listings.len());

    let reviews = match &config.reviews_csv {
        Some(path) => load_reviews_csv(path).with_context(|| format!("loading {}", path.display()))?,
        None => Vec::new(),
    };
    println!("✓ Loaded {} reviews", reviews.len());

    // 2. Setup database
    println!("\n🔧 Setting up database...");
    let mut conn = Connection::open(db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    setup_database(&conn)?;
    println!("✓ Database initialized with WAL mode");

    // 3. Insert rows
    println!("\n💾 Inserting rows...");
    insert_listings(&mut conn, &listings)?;
    insert_reviews(&mut conn, &reviews)?;

    // 4. Verify count
    println!("\n🔍 Verifying database...");
    let (listing_count, review_count) = verify_count(&conn)?;
    println!(
        "✓ Database contains {} listings and {} reviews",
        listing_count, review_count
    );

    if listing_count < listings.len() as i64 {
        println!(
            "✓ Duplicate listing ids collapsed: {}",
            listings.len() as i64 - listing_count
        );
    }

    Ok(())
}

fn run_report_command(
    config: &InsightsConfig,
    name: &str,
    sql: bool,
    dimension: &str,
    since: Option<chrono::NaiveDate>,
    listing_id: Option<i64>,
) -> Result<()> {
    if name == "list" {
        for kind in ReportKind::ALL {
            let marker = if kind.has_sql_variant() { " (sql)" } else { "" };
            println!("{}{}", kind, marker);
        }
        return Ok(());
    }

    let kind: ReportKind = name.parse()?;
    let params = ReportParams {
        since: since.unwrap_or(config.recent_since),
        dimension: dimension.parse::<GroupDimension>()?,
        listing_id,
    };

    let value = if sql {
        let db_path = config
            .database
            .as_ref()
            .context("--sql needs a database: pass --db or set `database` in the config")?;
        SqliteStore::new(db_path).with_connection(|conn| run_sql_report(kind, conn, &params))?
    } else {
        let data = config.data_source().snapshot()?;
        run_report(kind, &data, &params)?
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn run_suggest(config: &InsightsConfig, query: PriceQuery) -> Result<()> {
    let data = config.data_source().snapshot()?;

    match reports::suggest_price(&data.listings, &query) {
        Ok(suggestion) => {
            println!("💰 Suggested nightly price: {:.2}", suggestion.suggested_price);
            println!(
                "   (based on {} similar listings in {})",
                suggestion.similar_listings, query.neighbourhood
            );
            println!(
                "   avg {:.2} | min {:.2} | max {:.2}",
                suggestion.avg_price, suggestion.min_price, suggestion.max_price
            );
            Ok(())
        }
        Err(e) if e.is_advisory() => {
            println!("⚠️  {}. Try another combination.", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_export(config: &InsightsConfig, out: Option<PathBuf>) -> Result<()> {
    let data = config.data_source().snapshot()?;
    let text = export_listings_csv(&data.listings)?;

    match out {
        Some(path) => {
            fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("✓ Exported {} listings to {}", data.listings.len(), path.display());
        }
        None => print!("{}", text),
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &InsightsConfig) -> Result<()> {
    println!("🖥️  Loading Listing Insights dashboard...\n");

    let source = config.data_source();
    let data = source
        .snapshot()
        .with_context(|| format!("loading {}", source.describe()))?;

    println!("✓ Loaded {} listings, {} reviews\n", data.listings.len(), data.reviews.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(data, config);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &InsightsConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use web UI: cargo run --bin insights-server --features server");
    std::process::exit(1);
}
