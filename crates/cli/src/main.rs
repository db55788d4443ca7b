//! boodschap - Albert Heijn + Picnic cart workflow from the command
//! line.
//!
//! # Usage
//!
//! ```bash
//! # Log in (interactive browser flow)
//! boodschap login
//!
//! # Search and inspect products (works anonymously)
//! boodschap search "halfvolle melk" --limit 5
//! boodschap product 436469
//! boodschap bonus
//!
//! # Shopping list and order cart
//! boodschap list show
//! boodschap order add 436469 2
//! echo '[{"id": 436469, "qty": 2}]' | boodschap batch-add-to-order
//!
//! # Cross-store workflow
//! boodschap search-both "pindakaas"
//! echo '[{"name": "bananen", "qty": 1}]' | boodschap match-items --items-stdin
//! echo '[{"name": "bananen", "qty": 1}]' | boodschap add-both --items-stdin --auto-match --yes
//! boodschap compare-checkout --picnic-unit cents
//! ```
//!
//! Every command prints JSON on stdout and exits 0 on success, 1 on any
//! failure (unresolved matches, backend errors, auth problems). Logs go
//! to stderr (`RUST_LOG` controls verbosity).

#![cfg_attr(not(test), forbid(unsafe_code))]

mod commands;
mod error;
mod input;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use boodschap_ah::AhClient;
use boodschap_bridge::{AppConfig, PicnicCli, PicnicUnit};

use commands::both::{AddBothArgs, BridgeContext};
use error::CliError;
use input::ItemsInput;

#[derive(Parser)]
#[command(name = "boodschap", version, about = "Albert Heijn + Picnic cart workflow")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in interactively via the browser
    Login {
        /// How long to wait for the browser redirect
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
    },

    /// Forget the stored token
    Logout,

    /// Search Albert Heijn products
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Show details for one product
    Product { id: i64 },

    /// List current bonus products
    Bonus,

    /// Shopping list operations
    List {
        #[command(subcommand)]
        command: ListCommands,
    },

    /// Order cart operations
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },

    /// Add items to the shopping list from a JSON array on stdin
    BatchAdd,

    /// Add items to the order cart from a JSON array on stdin
    BatchAddToOrder,

    /// Search both stores at once
    SearchBoth {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Match plain grocery names to products in both stores
    MatchItems {
        #[command(flatten)]
        input: ItemsInput,
        /// Override the configured per-provider candidate limit
        #[arg(long)]
        search_limit: Option<usize>,
        /// Disable match-cache reads and writes
        #[arg(long)]
        no_cache: bool,
    },

    /// Add items to both carts (all items must match with high
    /// confidence before anything is written)
    AddBoth {
        #[command(flatten)]
        input: ItemsInput,
        /// Confirm the cart mutations
        #[arg(long)]
        yes: bool,
        /// Show planned actions without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Match names to both stores before adding
        #[arg(long)]
        auto_match: bool,
        /// Override the configured per-provider candidate limit
        #[arg(long)]
        search_limit: Option<usize>,
        /// Disable match-cache reads and writes
        #[arg(long)]
        no_cache: bool,
    },

    /// Fetch both carts
    CartBoth,

    /// Compare checkout totals and recommend the cheaper store
    CompareCheckout {
        /// How to interpret numeric Picnic totals
        #[arg(long)]
        picnic_unit: Option<PicnicUnit>,
        /// Include raw cart payloads in the output
        #[arg(long)]
        include_carts: bool,
    },
}

#[derive(Subcommand)]
enum ListCommands {
    /// Show the shopping list
    Show,
    /// Add a product to the shopping list
    Add {
        id: i64,
        #[arg(default_value_t = 1)]
        qty: u32,
    },
    /// Remove an entry from the shopping list
    Remove { entry: String },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Show the current order cart
    Show,
    /// Add a product to the order cart
    Add {
        id: i64,
        #[arg(default_value_t = 1)]
        qty: u32,
    },
    /// Empty the order cart
    Clear,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout is reserved for JSON output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(value) => output::print_json(&value),
        Err(e) => {
            output::print_error(&e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<Value, CliError> {
    let config = AppConfig::load(&cli.config)?;
    let ah = AhClient::new(&config.ah)?;

    match cli.command {
        Commands::Login { timeout_secs } => commands::auth::login(&ah, timeout_secs).await,
        Commands::Logout => commands::auth::logout(&ah),

        Commands::Search { query, limit } => commands::catalog::search(&ah, &query, limit).await,
        Commands::Product { id } => commands::catalog::product(&ah, id).await,
        Commands::Bonus => commands::catalog::bonus(&ah).await,

        Commands::List { command } => match command {
            ListCommands::Show => commands::list::show(&ah).await,
            ListCommands::Add { id, qty } => commands::list::add(&ah, id, qty).await,
            ListCommands::Remove { entry } => commands::list::remove(&ah, &entry).await,
        },
        Commands::Order { command } => match command {
            OrderCommands::Show => commands::order::show(&ah).await,
            OrderCommands::Add { id, qty } => commands::order::add(&ah, id, qty).await,
            OrderCommands::Clear => commands::order::clear(&ah).await,
        },
        Commands::BatchAdd => commands::list::batch_add(&ah).await,
        Commands::BatchAddToOrder => commands::order::batch_add(&ah).await,

        Commands::SearchBoth { query, limit } => {
            let picnic = PicnicCli::from_config(&config.cli_paths)?;
            let ctx = BridgeContext {
                ah: &ah,
                picnic: &picnic,
                config: &config,
            };
            commands::both::search_both(&ctx, &query, limit).await
        }
        Commands::MatchItems {
            input,
            search_limit,
            no_cache,
        } => {
            let picnic = PicnicCli::from_config(&config.cli_paths)?;
            let ctx = BridgeContext {
                ah: &ah,
                picnic: &picnic,
                config: &config,
            };
            commands::both::match_items(&ctx, &input, search_limit, no_cache).await
        }
        Commands::AddBoth {
            input,
            yes,
            dry_run,
            auto_match,
            search_limit,
            no_cache,
        } => {
            let picnic = PicnicCli::from_config(&config.cli_paths)?;
            let ctx = BridgeContext {
                ah: &ah,
                picnic: &picnic,
                config: &config,
            };
            commands::both::add_both(
                &ctx,
                AddBothArgs {
                    input,
                    yes,
                    dry_run,
                    auto_match,
                    search_limit,
                    no_cache,
                },
            )
            .await
        }
        Commands::CartBoth => {
            let picnic = PicnicCli::from_config(&config.cli_paths)?;
            let ctx = BridgeContext {
                ah: &ah,
                picnic: &picnic,
                config: &config,
            };
            commands::both::cart_both(&ctx).await
        }
        Commands::CompareCheckout {
            picnic_unit,
            include_carts,
        } => {
            let picnic = PicnicCli::from_config(&config.cli_paths)?;
            let ctx = BridgeContext {
                ah: &ah,
                picnic: &picnic,
                config: &config,
            };
            commands::both::compare_checkout(&ctx, picnic_unit, include_carts).await
        }
    }
}
