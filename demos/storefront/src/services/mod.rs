pub mod catalog_mock;
pub mod order_mock;
