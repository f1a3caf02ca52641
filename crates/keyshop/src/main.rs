//! # Keyshop demo
//!
//! Runs one buyer through checkout against the database named by
//! `KEYSHOP_DATABASE_PATH`, approves the order, then shows what is left.
//!
//! ```bash
//! KEYSHOP_OPERATOR_IDS=1 RUST_LOG=info cargo run
//! ```

use keyshop::config::Config;
use keyshop::model::{BuyerId, Days, Decision, NewCredential, OperatorId, ProductId};
use keyshop::notify::LogNotifier;
use keyshop::runtime::{setup_tracing, KeyShop};
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_tracing();

    let mut config = Config::from_env()?;
    if config.operators.is_empty() {
        config.operators.push(OperatorId(1));
    }
    let operator = config.operators[0];

    let shop = KeyShop::open(&config, Arc::new(LogNotifier)).await?;

    let product = ProductId::new("bgmi");
    let duration = Days(7);

    // Stock one key so the demo always has something to sell.
    let value = format!("BGMI-DEMO-{}", uuid::Uuid::new_v4().simple());
    shop.add_credential(NewCredential::new(product.clone(), duration.0, value))
        .await?;
    info!(
        available = shop.availability(&product, duration).await?,
        "Stock ready"
    );

    let buyer = BuyerId(1001);
    let span = tracing::info_span!("checkout", %buyer);
    let draft = async {
        let sessions = shop.sessions();
        sessions.start(buyer, "Demo Buyer").await?;
        sessions.pick_product(buyer, product.clone()).await?;
        let quote = sessions.pick_duration(buyer, duration).await?;
        info!(amount = quote.amount, "Quoted");
        sessions.submit_proof(buyer, "UTR 000111222333".to_string()).await
    }
    .instrument(span)
    .await?;

    let order = shop.checkout(draft).await?;
    info!(order_id = %order.id, "Order placed");

    match shop.decide(order.id, Decision::Approve, operator).await {
        Ok(outcome) => info!(
            order_id = %outcome.order.id,
            status = %outcome.status(),
            credential = outcome.credential().unwrap_or("-"),
            "Decided"
        ),
        Err(e) => error!(error = %e, "Decision failed"),
    }

    for count in shop.inventory_summary().await? {
        info!(product = %count.product, duration = %count.duration, available = count.available, "Inventory");
    }
    for sale in shop.recent_sales(5).await? {
        info!(order_id = %sale.order_id, buyer = %sale.buyer, amount = sale.amount, "Sale");
    }

    shop.shutdown().await?;
    Ok(())
}
