// demos/storefront/src/services/order_mock.rs
use async_trait::async_trait;
use cart_sync::{OrderPlacement, OrderReceipt, OrderRequest};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct MockOrder {
  pub id: String,
  pub lines: usize,
  pub amount: i64,
  pub currency: String,
  pub placed_at: DateTime<Utc>,
}

/// Simulated order/payment backend. Declines any order whose total in minor units is
/// 123 modulo 1000.
#[derive(Debug)]
pub struct MockOrderService {
  currency: String,
  latency: Duration,
  placed: Mutex<Vec<MockOrder>>,
}

impl MockOrderService {
  pub fn new(currency: impl Into<String>) -> Self {
    Self {
      currency: currency.into(),
      latency: Duration::from_millis(50),
      placed: Mutex::new(Vec::new()),
    }
  }

  pub fn placed(&self) -> Vec<MockOrder> {
    self.placed.lock().clone()
  }
}

#[async_trait]
impl OrderPlacement for MockOrderService {
  #[instrument(name = "MockOrderService::place_order", skip_all, fields(lines = request.items.len(), amount = request.totals.total, currency = %self.currency))]
  async fn place_order(&self, request: OrderRequest) -> anyhow::Result<OrderReceipt> {
    info!("Simulating order placement.");
    if request.totals.total <= 0 {
      anyhow::bail!("Order amount must be greater than zero");
    }
    tokio::time::sleep(self.latency).await; // Simulate network latency

    if request.totals.total % 1000 == 123 {
      warn!("Mock payment declined by test condition.");
      anyhow::bail!("Mock payment declined for amount {}", request.totals.total);
    }

    let order = MockOrder {
      id: format!("mock_order_{}", Uuid::new_v4()),
      lines: request.items.len(),
      amount: request.totals.total,
      currency: self.currency.clone(),
      placed_at: Utc::now(),
    };
    info!(order_id = %order.id, "Mock order placed.");
    let receipt = OrderReceipt {
      order_id: order.id.clone(),
      total: order.amount,
    };
    self.placed.lock().push(order);
    Ok(receipt)
  }
}
