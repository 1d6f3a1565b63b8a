//! Line item input
//!
//! Loosely shaped line data, as sent by a checkout screen: every field is
//! optional and numbers may arrive as JSON numbers or numeric strings. Input is
//! validated into a [`LineItem`] before it reaches a cart. Invalid values are
//! rejected with the offending field named; nothing is coerced to zero.

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    discounts,
    items::{ItemError, LineItem},
    products::{self, Catalog},
};

/// Errors raised while validating loosely shaped input.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field was absent.
    #[error("{0} is required")]
    Missing(&'static str),

    /// A field could not be read as a number.
    #[error("{field} is not a number: {value:?}")]
    NotANumber {
        /// Field name
        field: &'static str,
        /// Raw value
        value: String,
    },

    /// A field was negative.
    #[error("{field} must not be negative, got {value}")]
    Negative {
        /// Field name
        field: &'static str,
        /// Parsed value
        value: Decimal,
    },

    /// A count had a fractional part.
    #[error("{field} must be a whole number, got {value}")]
    NotWhole {
        /// Field name
        field: &'static str,
        /// Parsed value
        value: Decimal,
    },

    /// A count was zero.
    #[error("{0} must be at least 1")]
    NotPositive(&'static str),

    /// A percentage was outside 0 to 100.
    #[error("{field} must be between 0 and 100, got {value}")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Parsed value
        value: Decimal,
    },

    /// An amount had more decimal places than the currency has minor units.
    #[error("{field} has more decimal places than {currency} allows: {value}")]
    TooPrecise {
        /// Field name
        field: &'static str,
        /// Parsed value
        value: Decimal,
        /// Currency code
        currency: &'static str,
    },

    /// A value did not fit the target type.
    #[error("{field} is too large: {value}")]
    TooLarge {
        /// Field name
        field: &'static str,
        /// Value as received
        value: String,
    },

    /// The referenced product is not in the catalog.
    #[error("unknown product {0:?}")]
    UnknownProduct(String),

    /// The resulting line was rejected.
    #[error(transparent)]
    Item(#[from] ItemError),
}

/// A number as it arrives from a form: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    /// Plain number
    Number(f64),

    /// Numeric string, e.g. `"12.50"`
    Text(String),
}

impl NumericInput {
    fn to_decimal(&self, field: &'static str) -> Result<Decimal, ValidationError> {
        let text = match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text.trim().to_string(),
        };

        text.parse::<Decimal>()
            .map_err(|_err| unreadable_number(field, text))
    }
}

/// A number beyond the range of [`Decimal`] is too large, anything else is not a number.
fn unreadable_number(field: &'static str, text: String) -> ValidationError {
    let beyond_decimal = text.parse::<f64>().is_ok_and(|number| {
        number.is_finite() && Decimal::MAX.to_f64().is_some_and(|max| number.abs() > max)
    });

    if beyond_decimal {
        ValidationError::TooLarge { field, value: text }
    } else {
        ValidationError::NotANumber { field, value: text }
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Line data before validation.
///
/// `baseUnitPrice` and `taxRate` fall back to the catalog product when absent;
/// `discountRate` falls back to 0%.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    /// Backend product identifier
    pub product_id: Option<String>,

    /// Quantity, a positive whole number
    pub quantity: Option<NumericInput>,

    /// Tax-inclusive unit price in major units
    pub base_unit_price: Option<NumericInput>,

    /// Line discount in percent points
    pub discount_rate: Option<NumericInput>,

    /// Tax rate in percent points
    pub tax_rate: Option<NumericInput>,
}

impl LineItemInput {
    /// Validate the input against the catalog and build a line item.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first invalid field.
    pub fn validate<'a>(&self, catalog: &Catalog<'a>) -> Result<LineItem<'a>, ValidationError> {
        let product_id = self
            .product_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::Missing("productId"))?;

        let (key, product) = products::find_by_id(catalog, product_id)
            .ok_or_else(|| ValidationError::UnknownProduct(product_id.to_string()))?;

        let quantity = parse_quantity(
            "quantity",
            self.quantity
                .as_ref()
                .ok_or(ValidationError::Missing("quantity"))?,
        )?;

        let price = match &self.base_unit_price {
            Some(value) => parse_amount("baseUnitPrice", value, product.price.currency())?,
            None => product.price,
        };

        let tax_rate = match &self.tax_rate {
            Some(value) => parse_rate("taxRate", value)?,
            None => product.tax_rate,
        };

        let discount = match &self.discount_rate {
            Some(value) => parse_rate("discountRate", value)?,
            None => discounts::zero(),
        };

        Ok(LineItem::new(key, quantity, price)?
            .with_tax_rate(tax_rate)?
            .with_discount(discount)?)
    }
}

/// Parse a percentage given in percent points (`"10"` for 10%).
///
/// # Errors
///
/// Returns a [`ValidationError`] if the value is not a number in 0 to 100.
pub fn parse_rate(field: &'static str, value: &NumericInput) -> Result<Percentage, ValidationError> {
    let points = value.to_decimal(field)?;

    discounts::rate_from_points(points)
        .map_err(|_err| ValidationError::OutOfRange { field, value: points })
}

/// Parse a positive whole count.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the value is not a whole number of at least 1.
pub fn parse_quantity(field: &'static str, value: &NumericInput) -> Result<u32, ValidationError> {
    let quantity = value.to_decimal(field)?;

    if quantity < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field,
            value: quantity,
        });
    }

    if !quantity.fract().is_zero() {
        return Err(ValidationError::NotWhole {
            field,
            value: quantity,
        });
    }

    let quantity = quantity.to_u32().ok_or_else(|| ValidationError::TooLarge {
        field,
        value: quantity.to_string(),
    })?;

    if quantity == 0 {
        return Err(ValidationError::NotPositive(field));
    }

    Ok(quantity)
}

/// Parse a non-negative amount in major units into money of `currency`.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the value is negative, finer than the
/// currency's minor unit, or too large.
pub fn parse_amount<'a>(
    field: &'static str,
    value: &NumericInput,
    currency: &'a Currency,
) -> Result<Money<'a, Currency>, ValidationError> {
    let amount = value.to_decimal(field)?;

    if amount < Decimal::ZERO {
        return Err(ValidationError::Negative {
            field,
            value: amount,
        });
    }

    let too_large = || ValidationError::TooLarge {
        field,
        value: amount.to_string(),
    };

    let scale = 10_i64
        .checked_pow(currency.exponent)
        .map(Decimal::from)
        .ok_or_else(too_large)?;

    let minor = amount.checked_mul(scale).ok_or_else(too_large)?;

    if !minor.fract().is_zero() {
        return Err(ValidationError::TooPrecise {
            field,
            value: amount,
            currency: currency.iso_alpha_code,
        });
    }

    let minor = minor.to_i64().ok_or_else(too_large)?;

    Ok(Money::from_minor(minor, currency))
}
