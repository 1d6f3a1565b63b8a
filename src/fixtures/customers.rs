//! Customer Fixtures

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    customers::Customer,
    discounts,
    fixtures::{FixtureError, products::parse_percentage},
};

/// Wrapper for customers in YAML
#[derive(Debug, Deserialize)]
pub struct CustomersFixture {
    /// Map of backend customer id -> customer fixture
    pub customers: FxHashMap<String, CustomerFixture>,
}

/// Customer Fixture
#[derive(Debug, Deserialize)]
pub struct CustomerFixture {
    /// Display name
    pub name: String,

    /// Loyalty membership
    #[serde(default)]
    pub loyal: bool,

    /// Loyalty discount (e.g., "5%"), only meaningful for members
    #[serde(default)]
    pub loyalty_discount: Option<String>,
}

impl CustomerFixture {
    /// Build the customer for the given backend id.
    ///
    /// # Errors
    ///
    /// Returns an error if the loyalty discount cannot be parsed.
    pub fn into_customer(self, id: String) -> Result<Customer, FixtureError> {
        if !self.loyal {
            return Ok(Customer::new(id, self.name));
        }

        let discount = match self.loyalty_discount.as_deref() {
            Some(discount) => parse_percentage(discount)?,
            None => discounts::zero(),
        };

        Ok(Customer::loyal(id, self.name, discount)?)
    }
}
