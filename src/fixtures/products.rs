//! Product Fixtures

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{Findable, Money, iso::Currency};
use serde::Deserialize;

use crate::{discounts, fixtures::FixtureError, products::Product};

/// Wrapper for products in YAML
#[derive(Debug, Deserialize)]
pub struct ProductsFixture {
    /// Map of backend product id -> product fixture
    pub products: FxHashMap<String, ProductFixture>,
}

/// Product Fixture
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    /// Product name
    pub name: String,

    /// Part number
    pub reference: String,

    /// Tax-inclusive price (e.g., "100.00 GBP")
    pub price: String,

    /// Tax rate (e.g., "19%")
    #[serde(default)]
    pub tax_rate: Option<String>,

    /// Units in stock
    pub stock: u32,
}

impl ProductFixture {
    /// Build the catalog product for the given backend id.
    ///
    /// # Errors
    ///
    /// Returns an error if the price or tax rate cannot be parsed.
    pub fn into_product(self, id: String) -> Result<Product<'static>, FixtureError> {
        let (minor_units, currency) = parse_price(&self.price)?;

        let tax_rate = match self.tax_rate.as_deref() {
            Some(rate) => parse_percentage(rate)?,
            None => discounts::zero(),
        };

        Ok(Product {
            id,
            name: self.name,
            reference: self.reference,
            price: Money::from_minor(minor_units, currency),
            tax_rate,
            stock: self.stock,
        })
    }
}

/// Parse price string (e.g., "12.50 EUR") into minor units and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", if
/// the amount is not a non-negative number with at most the currency's minor
/// unit precision, or if the currency code is not recognized.
pub fn parse_price(s: &str) -> Result<(i64, &'static Currency), FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    let [amount, currency_code] = parts.as_slice() else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let currency = Currency::find(currency_code)
        .ok_or_else(|| FixtureError::UnknownCurrency((*currency_code).to_string()))?;

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    if amount < Decimal::ZERO {
        return Err(FixtureError::InvalidPrice(s.to_string()));
    }

    let minor = 10_i64
        .checked_pow(currency.exponent)
        .and_then(|scale| amount.checked_mul(Decimal::from(scale)))
        .filter(|minor| minor.fract().is_zero())
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    Ok((minor, currency))
}

/// Parse percentage string (e.g., "15%" or "0.15") into a `Percentage`
///
/// Accepts two formats:
/// - Percentage format: "15%" for 15%
/// - Decimal format: "0.15" for 15%
///
/// # Errors
///
/// Returns an error if the string cannot be parsed or lies outside 0% to 100%.
pub fn parse_percentage(s: &str) -> Result<Percentage, FixtureError> {
    let trimmed = s.trim();
    let invalid = |_err| FixtureError::InvalidPercentage(s.to_string());

    let points = if let Some(percent_str) = trimmed.strip_suffix('%') {
        percent_str.trim().parse::<Decimal>().map_err(invalid)?
    } else {
        trimmed.parse::<Decimal>().map_err(invalid)? * Decimal::ONE_HUNDRED
    };

    discounts::rate_from_points(points)
        .map_err(|_err| FixtureError::InvalidPercentage(s.to_string()))
}
