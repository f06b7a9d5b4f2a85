use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use opensolver_core::{
    MixReport, ProductMixStore, SavingsGoal, SavingsPlan, Scenario, SimplexSolver, StoreLimits, TabularInput,
    build_request, solve_mix,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "opensolver")]
#[command(about = "Goal-savings and product-mix calculators", long_about = None)]
struct Cli {
    /// Log model building and solver progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monthly contribution needed to reach a savings goal
    Savings {
        /// Amount to reach
        #[arg(long)]
        target: f64,
        /// Saving period in months
        #[arg(long, conflicts_with = "years", required_unless_present = "years")]
        months: Option<u32>,
        /// Saving period in years (rounded to whole months)
        #[arg(long)]
        years: Option<f64>,
        /// Expected annual return in percent
        #[arg(long, default_value_t = 0.0)]
        rate: f64,
        /// Amount invested up front
        #[arg(long, default_value_t = 0.0)]
        initial: f64,
        #[arg(long, default_value = "€")]
        currency: String,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find the most profitable product mix
    Mix {
        #[command(flatten)]
        input: MixInput,
        #[arg(long, default_value = "€")]
        currency: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the optimization model without solving it
    Model {
        #[command(flatten)]
        input: MixInput,
    },
    /// Convert the problem to a scenario JSON document
    Export {
        #[command(flatten)]
        input: MixInput,
    },
}

#[derive(Args)]
struct MixInput {
    /// Scenario JSON file
    #[arg(short, long, conflicts_with_all = ["products", "profits", "usage", "capacities"])]
    file: Option<PathBuf>,
    /// Product names, comma separated
    #[arg(long, required_unless_present = "file")]
    products: Option<String>,
    /// Profit per unit of each product, comma separated
    #[arg(long, required_unless_present = "file")]
    profits: Option<String>,
    /// Resource usage per unit; one row per resource separated by `;`,
    /// one column per product
    #[arg(long, required_unless_present = "file")]
    usage: Option<String>,
    /// Capacity of each resource row, comma separated
    #[arg(long, required_unless_present = "file")]
    capacities: Option<String>,
    /// Allow more than five resources
    #[arg(long)]
    unlimited: bool,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_store(input: &MixInput) -> ProductMixStore {
    let limits = if input.unlimited {
        StoreLimits::unbounded()
    } else {
        StoreLimits::default()
    };

    let loaded = match &input.file {
        Some(path) => {
            let source = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => fail(format!("cannot read {}: {}", path.display(), e)),
            };
            let scenario: Scenario = match serde_json::from_str(&source) {
                Ok(s) => s,
                Err(e) => fail(format!("invalid scenario {}: {}", path.display(), e)),
            };
            debug!(path = %path.display(), "scenario loaded");
            scenario.to_store(limits)
        }
        None => TabularInput {
            products: input.products.as_deref().unwrap_or_default(),
            profits: input.profits.as_deref().unwrap_or_default(),
            usage: input.usage.as_deref().unwrap_or_default(),
            capacities: input.capacities.as_deref().unwrap_or_default(),
        }
        .to_store(limits),
    };

    loaded.unwrap_or_else(|e| fail(e))
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| fail(e))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Savings {
            target,
            months,
            years,
            rate,
            initial,
            currency,
            json,
        } => {
            let months = match (months, years) {
                (Some(m), _) => m,
                (None, Some(y)) if y.is_finite() && y >= 0.0 => (y * 12.0).round() as u32,
                (None, _) => fail("--years must be a non-negative number"),
            };
            let goal = SavingsGoal {
                target,
                months,
                annual_rate_pct: rate,
                initial,
            };
            let plan = opensolver_core::plan(&goal);

            if json {
                println!("{}", to_json(&plan));
            } else {
                print!("{}", plan.render(&currency));
            }
            if matches!(plan, SavingsPlan::InvalidInput { .. }) {
                std::process::exit(1);
            }
        }
        Commands::Mix { input, currency, json } => {
            let store = load_store(&input);
            let report = match solve_mix(&store, &SimplexSolver::new()) {
                Ok(r) => r,
                Err(e) => fail(e),
            };

            if json {
                println!("{}", to_json(&report));
            } else {
                print!("{}", report.render(&currency));
            }
            if !matches!(report, MixReport::Optimal { .. }) {
                std::process::exit(1);
            }
        }
        Commands::Model { input } => {
            let store = load_store(&input);
            match build_request(&store) {
                Ok(request) => println!("{}", to_json(&request)),
                Err(e) => fail(e),
            }
        }
        Commands::Export { input } => {
            let store = load_store(&input);
            println!("{}", to_json(&Scenario::from_store(&store)));
        }
    }
}
