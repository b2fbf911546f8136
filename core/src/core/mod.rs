pub mod cart;
pub mod cart_item;
pub mod state;
pub mod totals;

// Re-export key types for easier access from other modules (and lib.rs)
pub use cart::{normalize_items, Cart};
pub use cart_item::{CartItem, Product};
pub use state::CartState;
pub use totals::{CartTotals, TaxRate};
