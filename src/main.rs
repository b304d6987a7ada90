//! `nextrade-quote`: landed-cost quotes from the command line.
//!
//! ```bash
//! nextrade-quote quote --destination Mongolia --teu 2 --incoterm CIF --mfg-cost 50000
//! nextrade-quote quote --destination Kazakhstan --teu 1 --incoterm DDP --unit-price 4800 --offline --json
//! nextrade-quote terms
//! nextrade-quote config
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use thiserror::Error;

use nextrade_logistics::domain::{
    CostEngine, Incoterm, IncotermAllocator, ProductCost, Quote, QuoteRequest, Quoter,
    ResolvedRates, RouteSpec, ValidationError,
};
use nextrade_logistics::infra::RateProvider;
use nextrade_logistics::util::logging::init_tracing;
use nextrade_logistics::util::settings::{
    load_settings, user_settings_file, Settings, SettingsError,
};
use nextrade_logistics::util::version::{version_label, APP_NAME};

#[derive(Parser, Debug)]
#[command(name = "nextrade-quote")]
#[command(version, about = "Landed-cost quotes split by trade term", long_about = None)]
struct Cli {
    /// Settings file layered over the per-user settings.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price a shipment under one trade term
    Quote(QuoteArgs),
    /// List the supported trade terms
    Terms,
    /// Print the effective settings as TOML
    Config,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("product").required(true).args(["mfg_cost", "unit_price"])))]
struct QuoteArgs {
    /// Destination name as configured (e.g. Mongolia, Kazakhstan)
    #[arg(long)]
    destination: String,

    /// Number of twenty-foot containers
    #[arg(long)]
    teu: u32,

    /// Trade term code, upper case (e.g. FOB, CIF, DDP)
    #[arg(long)]
    incoterm: Incoterm,

    /// Manufacturing cost of the whole shipment in USD
    #[arg(long)]
    mfg_cost: Option<Decimal>,

    /// Ex-factory price per unit in local currency
    #[arg(long)]
    unit_price: Option<Decimal>,

    /// Units per TEU when pricing by unit (defaults to the configured value)
    #[arg(long, requires = "unit_price")]
    units_per_teu: Option<u32>,

    /// Skip the live exchange-rate feed
    #[arg(long)]
    offline: bool,

    /// Output the quote as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to encode quote: {0}")]
    Json(#[from] serde_json::Error),
    #[error("either --mfg-cost or --unit-price is required")]
    MissingProductCost,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.logging);

    let result = match cli.command {
        Command::Quote(args) => run_quote(settings, args).await,
        Command::Terms => {
            print_terms();
            Ok(())
        }
        Command::Config => print_config(&settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_quote(mut settings: Settings, args: QuoteArgs) -> Result<(), CliError> {
    if args.offline {
        settings.rates.fx.enabled = false;
    }

    let product = match (args.mfg_cost, args.unit_price) {
        (Some(usd), _) => ProductCost::Usd(usd),
        (None, Some(unit_price)) => ProductCost::LocalUnitPrice {
            unit_price,
            units_per_teu: args.units_per_teu,
        },
        (None, None) => return Err(CliError::MissingProductCost),
    };
    let request = QuoteRequest {
        route: RouteSpec::new(args.destination, args.teu)?,
        incoterm: args.incoterm,
        product,
    };

    let quoter = Quoter::new(
        CostEngine::new(settings.engine.clone()),
        IncotermAllocator::new(settings.allocator.clone()),
        settings.quote.clone(),
    );
    // Reject unknown destinations before touching the network.
    quoter.engine().destination(request.route.destination())?;

    let resolved = RateProvider::from_settings(&settings.rates).resolve().await;
    let quote = quoter.quote(&request, &resolved)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else {
        print_quote(&quote, &resolved, &settings.rates.fx.quote);
    }
    Ok(())
}

fn money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn print_quote(quote: &Quote, resolved: &ResolvedRates, currency: &str) {
    println!("{APP_NAME} {}", version_label());
    println!("Quote {}", quote.id);
    println!(
        "Term:        {} ({}), {}",
        quote.incoterm,
        quote.incoterm.name(),
        quote.group.label()
    );
    println!(
        "Route:       {} ({} km rail), {} TEU",
        quote.destination, quote.bundle.rail_distance_km, quote.teu_count
    );
    println!("Transit:     {} door to door", quote.transit_days);
    println!(
        "Seller risk: {} ({:?})",
        quote.seller_risk.score, quote.seller_risk.level
    );
    println!();

    println!("Legs:");
    let bundle = &quote.bundle;
    let legs = [
        ("Ocean (Incheon-Lianyungang)", bundle.ocean_cost, quote.transit.ocean),
        ("Inland (KR)", bundle.inland_kr_cost, quote.transit.inland),
        ("Rail (TCR)", bundle.rail_cost, quote.transit.rail),
    ];
    for (leg, usd, days) in legs {
        let local = usd
            .checked_mul(bundle.exchange_rate)
            .map(money)
            .unwrap_or_else(|| "-".into());
        println!(
            "  {leg:<28} {:>12} USD {local:>16} {currency}  {days}",
            money(usd)
        );
    }
    println!();

    for item in &quote.line_items {
        println!("  {:<24} {:>16} USD", item.label, money(item.amount));
    }
    println!("  {}", "-".repeat(45));
    println!("  {:<24} {:>16} USD", "Total", money(quote.final_quote));
    println!(
        "  {:<24} {:>16} {currency}",
        "Total (local)",
        money(quote.final_quote_local)
    );
    println!(
        "  {:<24} {:>16} %",
        "Logistics share",
        money(quote.logistics_share_pct)
    );
    println!();

    let rates = &resolved.rates;
    println!("Rates used:");
    let values = [
        rates.ocean_rate_per_teu(),
        rates.rail_rate_per_km(),
        rates.margin_rate(),
        rates.exchange_rate(),
    ];
    for ((field, origin), value) in resolved.origins.iter().zip(values) {
        println!("  {field:<20} {value:>10}  ({})", origin.label());
    }
    if let Some(as_of) = resolved.fx_as_of {
        println!("  exchange rate published {as_of}");
    }
    if quote.degraded_rates {
        println!();
        println!("Warning: some rates fell back to built-in defaults.");
    }
}

fn print_terms() {
    println!("{:<5} {:<32} {:<22} {:>5}", "Code", "Name", "Group", "Lines");
    for term in Incoterm::ALL {
        let legacy = if term.is_legacy() { " (legacy)" } else { "" };
        println!(
            "{:<5} {:<32} {:<22} {:>5}",
            term.code(),
            format!("{}{legacy}", term.name()),
            term.group().label(),
            term.rule().len()
        );
    }
}

fn print_config(settings: &Settings) -> Result<(), CliError> {
    match user_settings_file() {
        Some(path) => println!("# user settings: {}", path.display()),
        None => println!("# user settings: unavailable on this platform"),
    }
    println!("# rate tables:   {}", settings.rates.data_dir().display());
    println!();
    print!("{}", settings.to_toml()?);
    Ok(())
}
