// demos/storefront/src/main.rs

mod config;
mod errors;
mod services;
mod state;

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::services::catalog_mock::format_amount;
use crate::state::AppState;

use cart_sync::{place_order, CartController};
use futures_util::future::join;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() {
  // RUST_LOG overrides the default level.
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront cart demo...");

  if let Err(e) = run().await {
    tracing::error!(error = %e, "Storefront demo failed.");
    std::process::exit(e.exit_code());
  }
}

async fn run() -> AppResult<()> {
  let app_config = Arc::new(AppConfig::from_env()?);
  let app_state = AppState::new(app_config.clone());
  tracing::info!(products = app_state.catalog.products().len(), "Catalog loaded.");
  // Long enough for a debounced save to land and echo back to every tab.
  let settle = app_config.cart_debounce + Duration::from_millis(100);

  // Two pages of the same session, e.g. the product list and the cart drawer.
  let tab_a = app_state.open_tab()?;
  let tab_b = app_state.open_tab()?;
  let (phase_a, phase_b) = join(tab_a.ready(), tab_b.ready()).await;
  tracing::info!(
    tab_a = %phase_a,
    tab_b = %phase_b,
    identity = ?app_state.session.resolved(),
    "Both tabs mounted."
  );

  // Browsing in tab A, with a burst of stepper clicks that collapses into one write.
  let catalog = &app_state.catalog;
  tab_a.add(catalog.find("glenfiddich-12")?, 1);
  tab_a.add(catalog.find("tonic-4pk")?, 1);
  for qty in 2..=4 {
    tokio::time::sleep(Duration::from_millis(40)).await;
    tab_a.set_qty("tonic-4pk", qty);
  }
  tokio::time::sleep(settle).await;
  log_cart("Tab B after tab A's edits", &tab_b, &app_config);
  tracing::info!(writes = app_state.store.write_count(), "Remote writes so far.");

  // Both tabs edit inside overlapping windows. Tab B saves last, so its cart wins everywhere.
  tab_a.add(catalog.find("hendricks-gin")?, 1);
  tokio::time::sleep(Duration::from_millis(100)).await;
  tab_b.add(catalog.find("lime-bag")?, 3);
  tokio::time::sleep(settle * 2).await;
  log_cart("Tab A after concurrent edits", &tab_a, &app_config);
  log_cart("Tab B after concurrent edits", &tab_b, &app_config);

  // Checkout from tab A clears the cart; the cleared cart propagates to tab B.
  let receipt = place_order(&tab_a, app_state.orders.as_ref()).await?;
  tracing::info!(
    order_id = %receipt.order_id,
    charged = %format_amount(receipt.total, &app_config.currency),
    "Order placed."
  );
  tokio::time::sleep(settle).await;
  log_cart("Tab B after checkout", &tab_b, &app_config);

  tab_a.unmount();
  tab_b.unmount();

  if let Some(key) = app_state.cart_document_key() {
    let document = app_state.store.document(&key);
    match document.as_ref().map(serde_json::to_string_pretty) {
      Some(Ok(json)) => tracing::info!(key = %key, "Stored document:\n{}", json),
      Some(Err(e)) => tracing::warn!(key = %key, error = %e, "Stored document failed to render."),
      None => tracing::info!(key = %key, "No document stored."),
    }
  }
  for order in app_state.orders.placed() {
    tracing::info!(
      order_id = %order.id,
      lines = order.lines,
      amount = %format_amount(order.amount, &order.currency),
      placed_at = %order.placed_at.to_rfc3339(),
      "Order on record."
    );
  }
  tracing::info!(
    writes = app_state.store.write_count(),
    "Storefront demo finished."
  );
  Ok(())
}

fn log_cart(label: &str, cart: &CartController, config: &AppConfig) {
  let totals = cart.totals();
  let lines: Vec<String> = cart
    .items()
    .iter()
    .map(|item| format!("{} x{}", item.name, item.qty))
    .collect();
  tracing::info!(
    count = totals.count,
    subtotal = %format_amount(totals.subtotal, &config.currency),
    tax = %format_amount(totals.tax, &config.currency),
    total = %format_amount(totals.total, &config.currency),
    "{}: [{}]",
    label,
    lines.join(", ")
  );
}
