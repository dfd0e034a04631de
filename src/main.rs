use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use travelbudget::{
    BudgetEstimate, BudgetEstimator, BudgetRule, TravelBudgetConfig, budget, telemetry, web,
};

#[derive(Parser)]
#[command(name = "travelbudget", version, about = "Trip budget estimation")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on, overrides the configured one
        #[arg(long)]
        port: Option<u16>,
    },
    /// Estimate a single trip
    Estimate {
        #[arg(long)]
        destination: String,
        #[arg(long, allow_negative_numbers = true)]
        party_size: i64,
        #[arg(long, allow_negative_numbers = true)]
        days: i64,
        /// spring, summer, autumn (or fall), winter
        #[arg(long)]
        season: String,
        /// Print the estimate as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage rate rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    /// Import rules from a JSON array, replacing rules for the same destination
    Import { file: PathBuf },
    /// List stored rules
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TravelBudgetConfig::load_from_path(cli.config.clone())
        .with_context(|| "Failed to load configuration")?;
    let _telemetry = telemetry::init(&config.logging, cli.verbose)?;

    if let Err(e) = run(cli.command, config).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(command: Command, mut config: TravelBudgetConfig) -> Result<()> {
    match command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let estimator = BudgetEstimator::from_config(&config)?;
            web::run(&config.server, Arc::new(estimator)).await
        }
        Command::Estimate {
            destination,
            party_size,
            days,
            season,
            json,
        } => {
            let estimator = BudgetEstimator::from_config(&config)?;
            let estimate = estimator
                .estimate_budget(&destination, party_size, days, &season)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&estimate)?);
            } else {
                print_estimate(&estimate);
            }
            Ok(())
        }
        Command::Rules { command } => run_rules(command, &config).await,
    }
}

async fn run_rules(command: RulesCommand, config: &TravelBudgetConfig) -> Result<()> {
    let Some(location) = &config.store.location else {
        bail!("No rule store configured; set store.location or TRAVELBUDGET_STORE__LOCATION");
    };
    let store = budget::open_store(config)?;

    match command {
        RulesCommand::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let rules: Vec<BudgetRule> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse rules from {}", file.display()))?;

            for rule in &rules {
                rule.validate()
                    .with_context(|| format!("Invalid rule for '{}'", rule.destination))?;
            }
            let count = rules.len();
            for mut rule in rules {
                rule.updated_at.get_or_insert_with(Utc::now);
                store.put_rule(rule).await?;
            }
            info!("Imported {} rules into {}", count, location);
            println!("Imported {count} rule(s)");
        }
        RulesCommand::List => {
            let rules = store.list_rules().await?;
            if rules.is_empty() {
                println!("No rules stored in {location}");
            }
            for rule in rules {
                let mut seasons: Vec<String> = rule
                    .seasonal_multipliers
                    .iter()
                    .map(|(season, m)| format!("{season} x{m:.2}"))
                    .collect();
                if seasons.is_empty() {
                    seasons.push("no seasonal adjustment".to_string());
                }
                println!("{}: {}", rule.destination, seasons.join(", "));
            }
        }
    }
    Ok(())
}

fn print_estimate(estimate: &BudgetEstimate) {
    println!(
        "Budget for {} ({} traveller(s), {} day(s), {})",
        estimate.destination, estimate.party_size, estimate.days, estimate.season
    );
    let rows = [
        ("Accommodation", estimate.breakdown.accommodation),
        ("Food", estimate.breakdown.food),
        ("Transportation", estimate.breakdown.transportation),
        ("Activities", estimate.breakdown.activities),
        ("Miscellaneous", estimate.breakdown.miscellaneous),
    ];
    for (label, amount) in rows {
        println!("  {label:<15} {amount:>8} {}", estimate.currency);
    }
    println!("  {:<15} {:>8} {}", "Total", estimate.total, estimate.currency);
    println!("Source: {}", estimate.strategy);

    for (title, places) in [("Hotels", &estimate.lodging), ("Restaurants", &estimate.dining)] {
        if places.is_empty() {
            continue;
        }
        println!("{title}:");
        for place in places {
            let rating = place
                .rating
                .map_or_else(|| "unrated".to_string(), |r| format!("{r:.1}/5"));
            println!("  - {} ({}, {})", place.name, rating, place.price_label());
        }
    }

    if !estimate.insights.is_empty() {
        println!();
        println!("{}", estimate.insights);
    }
}
