//! Auto-parts POS
//!
//! Checkout core for an auto-parts point of sale: the in-memory cart, the
//! tax-inclusive totals calculation, the pre-submission validation policy and
//! the hand-off of a flattened sale to the backend.

pub mod cart;
pub mod checkout;
pub mod config;
pub mod customers;
pub mod discounts;
pub mod fixtures;
pub mod gateway;
pub mod items;
pub mod observability;
pub mod payments;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod receipt;
