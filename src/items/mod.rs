//! Items

use decimal_percentage::Percentage;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    discounts::{self, DiscountError},
    products::{Product, ProductKey},
};

pub mod input;

/// Errors raised when building or editing a line item.
#[derive(Debug, Error, PartialEq)]
pub enum ItemError {
    /// Quantity must be a positive integer.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// Unit price below zero (minor units).
    #[error("unit price must not be negative, got {0} minor units")]
    NegativePrice(i64),

    /// Line discount outside 0% to 100%.
    #[error("invalid discount rate: {0}")]
    Discount(#[source] DiscountError),

    /// Tax rate outside 0% to 100%.
    #[error("invalid tax rate: {0}")]
    TaxRate(#[source] DiscountError),
}

/// A single product entry in a cart.
///
/// The unit price is tax-inclusive and taken before the line discount.
#[derive(Clone, Debug)]
pub struct LineItem<'a> {
    product: ProductKey,
    quantity: u32,
    base_unit_price: Money<'a, Currency>,
    discount: Percentage,
    tax_rate: Percentage,
}

impl<'a> LineItem<'a> {
    /// Creates an undiscounted, untaxed line.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is zero or the price is negative.
    pub fn new(
        product: ProductKey,
        quantity: u32,
        base_unit_price: Money<'a, Currency>,
    ) -> Result<Self, ItemError> {
        if quantity == 0 {
            return Err(ItemError::ZeroQuantity);
        }

        let minor = base_unit_price.to_minor_units();

        if minor < 0 {
            return Err(ItemError::NegativePrice(minor));
        }

        Ok(Self {
            product,
            quantity,
            base_unit_price,
            discount: discounts::zero(),
            tax_rate: discounts::zero(),
        })
    }

    /// Creates a line for a catalog product, using its price and tax rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is zero or the product data is out of range.
    pub fn from_product(
        key: ProductKey,
        product: &Product<'a>,
        quantity: u32,
    ) -> Result<Self, ItemError> {
        Self::new(key, quantity, product.price)?.with_tax_rate(product.tax_rate)
    }

    /// Sets the line discount.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::Discount`] if the rate is outside 0% to 100%.
    pub fn with_discount(mut self, discount: Percentage) -> Result<Self, ItemError> {
        self.set_discount(discount)?;

        Ok(self)
    }

    /// Sets the tax rate embedded in the unit price.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::TaxRate`] if the rate is outside 0% to 100%.
    pub fn with_tax_rate(mut self, tax_rate: Percentage) -> Result<Self, ItemError> {
        self.tax_rate = discounts::ensure_rate(tax_rate).map_err(ItemError::TaxRate)?;

        Ok(self)
    }

    /// Changes the line discount in place.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::Discount`] if the rate is outside 0% to 100%.
    pub fn set_discount(&mut self, discount: Percentage) -> Result<(), ItemError> {
        self.discount = discounts::ensure_rate(discount).map_err(ItemError::Discount)?;

        Ok(())
    }

    /// Changes the quantity in place.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::ZeroQuantity`] if `quantity` is zero.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), ItemError> {
        if quantity == 0 {
            return Err(ItemError::ZeroQuantity);
        }

        self.quantity = quantity;

        Ok(())
    }

    /// Returns the product of the line
    pub fn product(&self) -> ProductKey {
        self.product
    }

    /// Returns the quantity
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns the tax-inclusive unit price before the line discount
    pub fn base_unit_price(&self) -> &Money<'a, Currency> {
        &self.base_unit_price
    }

    /// Returns the line discount
    pub fn discount(&self) -> Percentage {
        self.discount
    }

    /// Returns the tax rate
    pub fn tax_rate(&self) -> Percentage {
        self.tax_rate
    }

    /// Unit price after the line discount, rounded to minor units.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::PercentConversion`] if the calculation overflows.
    pub fn final_unit_price(&self) -> Result<Money<'a, Currency>, DiscountError> {
        let minor =
            discounts::discounted_minor(&self.discount, self.base_unit_price.to_minor_units())?;

        Ok(Money::from_minor(minor, self.base_unit_price.currency()))
    }
}
