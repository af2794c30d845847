// Capital Repair Import - CLI
// Regional reports, housing-fund linking and registry enrichment into one SQLite store

use anyhow::{bail, Context, Result};
use capital_repair::collapse::{collapse_files, write_collapsed};
use capital_repair::db::{self, region_summaries, table_counts};
use capital_repair::import::{self, ImportContext, ReportKind};
use capital_repair::AppConfig;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "capital-repair")]
#[command(about = "Capital-repair buildings and management companies: import and linking")]
#[command(version)]
struct Cli {
    /// TOML settings file
    #[arg(short, long, global = true, env = "CAPREPAIR_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database (overrides settings and environment)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print stage summaries as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the schema and seed regions
    Init,

    /// Import regional reports (1.1 buildings, 1.2 components, 1.3 services)
    Import {
        /// Region code or "all"
        #[arg(short, long, default_value = "all")]
        region: String,

        /// Only this report: 1.1, 1.2 or 1.3
        #[arg(long)]
        report: Option<String>,

        /// Delete the region's existing rows for the selected report(s) first
        #[arg(long)]
        clean: bool,
    },

    /// Collapse housing-fund exports and link buildings to management companies
    Link {
        /// Region code or "all"
        #[arg(short, long, default_value = "all")]
        region: String,
    },

    /// Enrich management companies with registry contacts
    Registry {
        /// Registry CSV (defaults to the configured registry file)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Collapse housing-fund exports into one CSV row per house
    Collapse {
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Regions, all reports, linking and registry in one run
    Full,

    /// Row counts per table and per region
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db_path) = cli.db {
        config.db_path = db_path;
    }

    let json = cli.json;
    match cli.command {
        Command::Init => run_init(config),
        Command::Import { region, report, clean } => run_import(config, &region, report.as_deref(), clean, json),
        Command::Link { region } => run_link(config, &region, json),
        Command::Registry { file } => run_registry(config, file, json),
        Command::Collapse { input, out } => run_collapse(config, &input, &out),
        Command::Full => run_full(config, json),
        Command::Stats => run_stats(config, json),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize summary")?);
    Ok(())
}

fn open(config: &AppConfig) -> Result<Connection> {
    db::open_database(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))
}

fn run_init(config: AppConfig) -> Result<()> {
    println!("🔧 Initializing database...");
    let conn = open(&config)?;
    let seeded = db::seed_regions(&conn, &config.reference_data())?;
    println!("✓ Schema ready at {}", config.db_path.display());
    println!("✓ {} regions seeded", seeded);
    Ok(())
}

fn run_import(config: AppConfig, region: &str, report: Option<&str>, clean: bool, json: bool) -> Result<()> {
    let only = match report {
        Some(code) => match ReportKind::from_code(code) {
            Some(kind) => Some(kind),
            None => bail!("Unknown report '{}': expected 1.1, 1.2 or 1.3", code),
        },
        None => None,
    };

    let mut conn = open(&config)?;
    let ctx = ImportContext::new(config);

    if !json {
        println!("📂 Importing regional reports ({})...", region);
    }
    let summary = import::import_regions(&mut conn, &ctx, Some(region), only, clean)?;
    if json {
        print_json(&summary)?;
        return finish(summary.failures.len());
    }

    for result in &summary.regions {
        if clean {
            println!("🧹 Region {}: {} rows cleaned", result.region, result.cleaned);
        }
        for report in &result.reports {
            println!(
                "✓ Region {} report {}: {} rows written, {} skipped",
                result.region,
                report.kind.code(),
                report.rows_written,
                report.rows_skipped
            );
        }
    }
    finish(summary.failures.len())
}

fn run_link(config: AppConfig, region: &str, json: bool) -> Result<()> {
    let mut conn = open(&config)?;
    let ctx = ImportContext::new(config);

    if !json {
        println!("🔗 Linking buildings to management companies ({})...", region);
    }
    let summary = import::link_regions(&mut conn, &ctx, Some(region))?;
    if json {
        print_json(&summary)?;
        return finish(summary.failures.len());
    }

    for result in &summary.regions {
        println!(
            "✓ Region {}: {} houses, {} companies, {} new links",
            result.region, result.collapse.distinct_keys, result.companies_upserted, result.links_created
        );
    }
    let totals = &summary.totals;
    println!(
        "📊 Matched by identifier: {}, by code + address: {}, by address only: {}, unmatched: {}",
        totals.by_identifier, totals.by_composite, totals.by_address, totals.unmatched
    );
    finish(summary.failures.len())
}

fn run_registry(config: AppConfig, file: Option<PathBuf>, json: bool) -> Result<()> {
    let path = file.unwrap_or_else(|| config.registry_path());
    let mut conn = open(&config)?;
    let ctx = ImportContext::new(config);

    if !json {
        println!("📇 Enriching companies from {}...", path.display());
    }
    let summary = import::import_registry(&mut conn, &ctx, &path)
        .with_context(|| format!("Registry import failed for {}", path.display()))?;
    if json {
        return print_json(&summary);
    }

    println!("✓ {} rows read, {} applied, {} unknown", summary.rows_read, summary.rows_applied, summary.rows_unknown);
    println!(
        "✓ Contacts: {} phones, {} emails, {} directors",
        summary.with_phone, summary.with_email, summary.with_director
    );
    Ok(())
}

fn run_collapse(config: AppConfig, input: &[PathBuf], out: &Path) -> Result<()> {
    let reference = config.reference_data();

    println!("🧮 Collapsing {} file(s)...", input.len());
    let (records, stats) = collapse_files(input, &reference, config.chunk_size).context("Collapse failed")?;
    let written = write_collapsed(out, &records)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("✓ {} rows read, {} without a house identifier", stats.rows_seen, stats.keyless_rows);
    println!(
        "✓ {} houses written to {} ({:.1}% with registration number)",
        written,
        out.display(),
        stats.ogrn_share() * 100.0
    );
    Ok(())
}

fn run_full(config: AppConfig, json: bool) -> Result<()> {
    let mut conn = open(&config)?;
    let ctx = ImportContext::new(config);

    if !json {
        println!("🚚 Full import");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
    let summary = import::run_full(&mut conn, &ctx)?;
    if json {
        print_json(&summary)?;
        return finish(summary.failure_count());
    }

    println!("✓ Report rows written: {}", summary.reports.rows_written());
    println!("✓ Links created: {}", summary.linking.links_created());
    let totals = &summary.linking.totals;
    println!(
        "📊 Matched by identifier: {}, by code + address: {}, by address only: {}, unmatched: {}",
        totals.by_identifier, totals.by_composite, totals.by_address, totals.unmatched
    );
    match &summary.registry {
        Some(registry) => println!("✓ Registry: {} companies updated", registry.companies_updated),
        None => println!("⚠️  Registry skipped"),
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    finish(summary.failure_count())
}

fn run_stats(config: AppConfig, json: bool) -> Result<()> {
    let conn = open(&config)?;
    let counts = table_counts(&conn)?;
    if json {
        return print_json(&counts);
    }

    println!("📊 Database: {}", config.db_path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  regions:               {}", counts.regions);
    println!("  municipalities:        {}", counts.municipalities);
    println!("  buildings:             {}", counts.buildings);
    println!("  management_companies:  {}", counts.management_companies);
    println!("  buildings_management:  {}", counts.buildings_management);
    println!("  lifts:                 {}", counts.lifts);
    println!("  construction_elements: {}", counts.construction_elements);
    println!("  services:              {}", counts.services);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for region in region_summaries(&conn)? {
        if region.buildings == 0 && region.companies == 0 {
            continue;
        }
        println!(
            "  {} {}: {} buildings, {} linked, {} companies",
            region.region_code, region.name, region.buildings, region.linked_buildings, region.companies
        );
    }
    Ok(())
}

/// Non-zero exit when any file or region failed
fn finish(failures: usize) -> Result<()> {
    if failures > 0 {
        eprintln!("❌ {} file(s) or region(s) failed, see log", failures);
        std::process::exit(1);
    }
    eprintln!("✅ Done");
    Ok(())
}
