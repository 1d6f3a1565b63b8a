//! Auto-parts POS checkout
//!
//! Loads a fixture set, prints its cart receipt and optionally submits the
//! sale to the backend.

use std::{io, process};

use tracing::{error, info};

use autoparts_pos::{
    checkout::CheckoutService,
    config::PosConfig,
    fixtures::Fixture,
    gateway::HttpSaleGateway,
    observability,
    receipt::Receipt,
};

/// POS checkout entry point
#[tokio::main]
pub async fn main() {
    // Load configuration from .env and CLI arguments
    let config = PosConfig::load().unwrap_or_else(|e| e.exit());

    if let Err(init_error) = observability::init(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialise, must use eprintln"
        )]
        {
            eprintln!("Logging error: {init_error}");
        }

        process::exit(1);
    }

    let mut fixture = Fixture::with_base_path(&config.fixtures_dir);

    if let Err(load_error) = fixture.load_set(&config.fixture) {
        error!(set = %config.fixture, "failed to load fixture set: {load_error}");

        process::exit(1);
    }

    let mut cart = match fixture.cart() {
        Ok(cart) => cart,
        Err(cart_error) => {
            error!(set = %config.fixture, "failed to build cart: {cart_error}");

            process::exit(1);
        }
    };

    if let Some(payment) = config.payment {
        cart.set_payment_method(payment);
    }

    let printed = Receipt::from_cart(&cart)
        .and_then(|receipt| receipt.write_to(io::stdout().lock(), fixture.catalog()));

    if let Err(receipt_error) = printed {
        error!("failed to print receipt: {receipt_error}");

        process::exit(1);
    }

    if !config.submit {
        return;
    }

    let checkout = CheckoutService::new(HttpSaleGateway::new(config.backend.gateway()));

    match checkout.submit(&mut cart, fixture.catalog()).await {
        Ok(confirmation) => info!(sale = %confirmation.id, "sale submitted"),
        Err(submit_error) => {
            error!("sale not submitted: {submit_error}");

            process::exit(1);
        }
    }
}
