//! Customers

use decimal_percentage::Percentage;

use crate::discounts::{self, DiscountError};

/// Customer account selected for a sale.
#[derive(Debug, Clone)]
pub struct Customer {
    id: String,
    name: String,
    is_loyal_client: bool,
    loyalty_discount: Percentage,
}

impl Customer {
    /// Create a customer without loyalty membership.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_loyal_client: false,
            loyalty_discount: discounts::zero(),
        }
    }

    /// Create a loyalty member with the given loyalty discount.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::OutOfRange`] if the discount is outside 0% to 100%.
    pub fn loyal(
        id: impl Into<String>,
        name: impl Into<String>,
        loyalty_discount: Percentage,
    ) -> Result<Self, DiscountError> {
        Ok(Self {
            id: id.into(),
            name: name.into(),
            is_loyal_client: true,
            loyalty_discount: discounts::ensure_rate(loyalty_discount)?,
        })
    }

    /// Backend identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the customer is flagged as a loyalty member.
    pub fn is_loyal_client(&self) -> bool {
        self.is_loyal_client
    }

    /// The configured loyalty discount, applied or not.
    pub fn loyalty_discount(&self) -> Percentage {
        self.loyalty_discount
    }

    /// The loyalty discount to apply to a sale, if any.
    ///
    /// Only loyalty members with a non-zero discount get one.
    pub fn applicable_loyalty_discount(&self) -> Option<Percentage> {
        (self.is_loyal_client && !discounts::is_zero(self.loyalty_discount))
            .then_some(self.loyalty_discount)
    }
}
