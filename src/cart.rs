//! Cart
//!
//! The cart owned by one sale session. It holds the ordered lines and the
//! sale-wide settings; totals are never stored, only recomputed from a
//! snapshot by [`calculate_totals`].

use decimal_percentage::Percentage;
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::debug;

use crate::{
    customers::Customer,
    discounts::{self, DiscountError},
    items::{ItemError, LineItem},
    payments::PaymentMethod,
    pricing::{CartTotals, PricingError, calculate_totals},
};

/// Errors related to cart mutations.
#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    /// An item's currency differs from the cart currency (item currency, cart currency).
    #[error("Item has currency {0}, but cart has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// No line at this index.
    #[error("Line {0} not found")]
    ItemNotFound(usize),

    /// The edited line was rejected.
    #[error(transparent)]
    Item(#[from] ItemError),

    /// A sale-wide discount was out of range.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// Cart
#[derive(Debug, Clone)]
pub struct Cart<'a> {
    items: Vec<LineItem<'a>>,
    currency: &'static Currency,
    global_discount: Percentage,
    customer: Option<Customer>,
    payment_method: PaymentMethod,
}

impl<'a> Cart<'a> {
    /// Create an empty cart.
    #[must_use]
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: Vec::new(),
            currency,
            global_discount: discounts::zero(),
            customer: None,
            payment_method: PaymentMethod::default(),
        }
    }

    /// Create a cart with the given items.
    ///
    /// # Errors
    ///
    /// Returns a `CartError` if there was a currency mismatch error.
    pub fn with_items(
        items: impl Into<Vec<LineItem<'a>>>,
        currency: &'static Currency,
    ) -> Result<Self, CartError> {
        let mut cart = Cart::new(currency);

        for item in items.into() {
            cart.add_item(item)?;
        }

        Ok(cart)
    }

    /// Append a line, returning its index.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CurrencyMismatch`] if the line is priced in another currency.
    pub fn add_item(&mut self, item: LineItem<'a>) -> Result<usize, CartError> {
        let item_currency = item.base_unit_price().currency();

        if item_currency != self.currency {
            return Err(CartError::CurrencyMismatch(
                item_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        debug!(
            quantity = item.quantity(),
            unit_price = item.base_unit_price().to_minor_units(),
            "line added"
        );

        self.items.push(item);

        Ok(self.items.len() - 1)
    }

    /// Remove and return the line at `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] if there is no such line.
    pub fn remove_item(&mut self, idx: usize) -> Result<LineItem<'a>, CartError> {
        if idx >= self.items.len() {
            return Err(CartError::ItemNotFound(idx));
        }

        debug!(line = idx, "line removed");

        Ok(self.items.remove(idx))
    }

    /// Change the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is missing or the quantity is zero.
    pub fn set_quantity(&mut self, idx: usize, quantity: u32) -> Result<(), CartError> {
        self.get_item_mut(idx)?.set_quantity(quantity)?;

        Ok(())
    }

    /// Change the discount of a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is missing or the rate is out of range.
    pub fn set_line_discount(&mut self, idx: usize, discount: Percentage) -> Result<(), CartError> {
        self.get_item_mut(idx)?.set_discount(discount)?;

        Ok(())
    }

    /// Set the discount applied to the whole sale.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Discount`] if the rate is out of range.
    pub fn set_global_discount(&mut self, discount: Percentage) -> Result<(), CartError> {
        self.global_discount = discounts::ensure_rate(discount)?;

        Ok(())
    }

    /// Select the customer, or clear the selection with `None`.
    pub fn select_customer(&mut self, customer: Option<Customer>) {
        self.customer = customer;
    }

    /// Choose how the sale will be paid.
    pub fn set_payment_method(&mut self, payment_method: PaymentMethod) {
        self.payment_method = payment_method;
    }

    /// Recompute the totals from the current lines and settings.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the amounts cannot be represented.
    pub fn totals(&self) -> Result<CartTotals<'a>, PricingError> {
        calculate_totals(
            &self.items,
            self.currency,
            self.global_discount,
            self.customer.as_ref(),
        )
    }

    /// Drop every line and reset the sale-wide settings.
    pub fn clear(&mut self) {
        self.items.clear();
        self.global_discount = discounts::zero();
        self.customer = None;
        self.payment_method = PaymentMethod::default();
    }

    /// Get a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns a `CartError::ItemNotFound` if the line is not found.
    pub fn get_item(&self, idx: usize) -> Result<&LineItem<'a>, CartError> {
        self.items.get(idx).ok_or(CartError::ItemNotFound(idx))
    }

    fn get_item_mut(&mut self, idx: usize) -> Result<&mut LineItem<'a>, CartError> {
        self.items.get_mut(idx).ok_or(CartError::ItemNotFound(idx))
    }

    /// The lines, in the order they were added.
    pub fn items(&self) -> &[LineItem<'a>] {
        &self.items
    }

    /// Iterate over the lines in the cart.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem<'a>> {
        self.items.iter()
    }

    /// Get the number of lines in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the currency of the cart.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// The discount applied to the whole sale.
    pub fn global_discount(&self) -> Percentage {
        self.global_discount
    }

    /// The selected customer, if any.
    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    /// The chosen payment method.
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }
}
