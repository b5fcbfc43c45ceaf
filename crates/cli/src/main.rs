//! Driftwood CLI - inspect and mutate the checkout session from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the current cart
//! drift show
//!
//! # Add one unit of a variant (raw id, gid:// URL, or base64 gid)
//! drift add gid://shopify/ProductVariant/1234567890
//!
//! # Step a line's quantity
//! drift inc <line-id>
//! drift dec <line-id>
//!
//! # Remove a line entirely
//! drift remove <line-id>
//!
//! # Print the hosted checkout URL
//! drift checkout
//! ```
//!
//! Requires `SHOPIFY_STORE` and `SHOPIFY_STOREFRONT_TOKEN` in the
//! environment (or a `.env` file). The session reference persists in
//! `.driftwood-checkout.json` between invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "drift")]
#[command(author, version, about = "Driftwood cart CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current cart contents
    Show,
    /// Add one unit of a variant to the cart
    Add {
        /// Variant reference: raw id, gid:// URL, or base64-encoded gid
        variant_ref: String,
    },
    /// Remove a line from the cart entirely
    Remove {
        /// Line item id
        line_id: String,
    },
    /// Raise a line's quantity by one
    Inc {
        /// Line item id
        line_id: String,
    },
    /// Lower a line's quantity by one (removes the line at quantity 1)
    Dec {
        /// Line item id
        line_id: String,
    },
    /// Print the hosted checkout URL
    Checkout,
    /// Clear the displayed cart after order completion
    Clear,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cart = commands::cart::coordinator()?;

    match cli.command {
        Commands::Show => commands::cart::show(&cart).await,
        Commands::Add { variant_ref } => commands::cart::add(&cart, &variant_ref).await,
        Commands::Remove { line_id } => commands::cart::remove(&cart, &line_id).await,
        Commands::Inc { line_id } => commands::cart::increment(&cart, &line_id).await,
        Commands::Dec { line_id } => commands::cart::decrement(&cart, &line_id).await,
        Commands::Checkout => commands::cart::checkout_url(&cart).await?,
        Commands::Clear => commands::cart::clear(&cart),
    }
    Ok(())
}
