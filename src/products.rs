//! Products

use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Product Key
    pub struct ProductKey;
}

/// Catalog of products known to the current sale session.
pub type Catalog<'a> = SlotMap<ProductKey, Product<'a>>;

/// Product, as cached from the backend catalog for a sale session.
#[derive(Debug, Clone)]
pub struct Product<'a> {
    /// Backend identifier
    pub id: String,

    /// Product name
    pub name: String,

    /// Part number
    pub reference: String,

    /// Tax-inclusive unit price
    pub price: Money<'a, Currency>,

    /// Tax rate embedded in the price
    pub tax_rate: Percentage,

    /// Known stock quantity
    pub stock: u32,
}

/// Find a product by its backend identifier.
pub fn find_by_id<'c, 'a>(
    catalog: &'c Catalog<'a>,
    id: &str,
) -> Option<(ProductKey, &'c Product<'a>)> {
    catalog.iter().find(|(_, product)| product.id == id)
}
