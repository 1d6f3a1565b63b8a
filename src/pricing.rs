//! Pricing
//!
//! The cart totals calculator. Prices are tax-inclusive, so tax is backed out
//! of each line (`gross × rate / (100 + rate)`) before the cart-wide
//! discounts are applied. Discounts apply in a fixed order: line discount,
//! then the global discount on the tax-inclusive subtotal, then the loyalty
//! discount on what is left.
//!
//! Every amount is held in minor units and rounded half away from zero at the
//! point it is derived, so each subtraction in the breakdown is exact.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    customers::Customer,
    discounts::{self, DiscountError},
    items::LineItem,
};

/// Errors that can occur while calculating cart totals.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// A line's currency differs from the cart currency (index, line currency, cart currency).
    #[error("Line {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// Minor unit arithmetic overflowed while pricing a line.
    #[error("amount overflowed while pricing line {0}")]
    LineOverflow(usize),

    /// Minor unit arithmetic overflowed while totalling the cart.
    #[error("amount overflowed while totalling the cart")]
    Overflow,

    /// Percentage calculation failed.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// Price breakdown of a single cart line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTotals<'a> {
    /// Unit price after the line discount
    pub final_unit_price: Money<'a, Currency>,

    /// `quantity × final_unit_price`, tax included
    pub total_incl_tax: Money<'a, Currency>,

    /// Tax backed out of `total_incl_tax`
    pub tax: Money<'a, Currency>,

    /// `total_incl_tax − tax`
    pub total_excl_tax: Money<'a, Currency>,

    /// Amount taken off by the line discount
    pub discount: Money<'a, Currency>,
}

/// Totals breakdown for a cart, recomputed from scratch on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct CartTotals<'a> {
    lines: SmallVec<[LineTotals<'a>; 8]>,
    total_excl_tax: Money<'a, Currency>,
    total_tax: Money<'a, Currency>,
    subtotal_incl_tax: Money<'a, Currency>,
    global_discount_rate: Decimal,
    global_discount_amount: Money<'a, Currency>,
    subtotal_after_global_discount: Money<'a, Currency>,
    loyalty_discount_rate: Decimal,
    loyalty_discount_amount: Money<'a, Currency>,
    total_incl_tax: Money<'a, Currency>,
    line_discount_total: Money<'a, Currency>,
    currency: &'static Currency,
}

impl<'a> CartTotals<'a> {
    /// Per-line breakdown, in cart order
    pub fn lines(&self) -> &[LineTotals<'a>] {
        &self.lines
    }

    /// Sum of line totals with tax backed out
    pub fn total_excl_tax(&self) -> Money<'a, Currency> {
        self.total_excl_tax
    }

    /// Sum of tax backed out of each line
    pub fn total_tax(&self) -> Money<'a, Currency> {
        self.total_tax
    }

    /// `total_excl_tax + total_tax`
    pub fn subtotal_incl_tax(&self) -> Money<'a, Currency> {
        self.subtotal_incl_tax
    }

    /// Global discount in percent points
    pub fn global_discount_rate(&self) -> Decimal {
        self.global_discount_rate
    }

    /// Amount taken off by the global discount
    pub fn global_discount_amount(&self) -> Money<'a, Currency> {
        self.global_discount_amount
    }

    /// `subtotal_incl_tax − global_discount_amount`
    pub fn subtotal_after_global_discount(&self) -> Money<'a, Currency> {
        self.subtotal_after_global_discount
    }

    /// Loyalty discount in percent points, zero when none applies
    pub fn loyalty_discount_rate(&self) -> Decimal {
        self.loyalty_discount_rate
    }

    /// Amount taken off by the loyalty discount
    pub fn loyalty_discount_amount(&self) -> Money<'a, Currency> {
        self.loyalty_discount_amount
    }

    /// Final payable amount
    pub fn total_incl_tax(&self) -> Money<'a, Currency> {
        self.total_incl_tax
    }

    /// Sum of amounts taken off by line discounts
    pub fn line_discount_total(&self) -> Money<'a, Currency> {
        self.line_discount_total
    }

    /// Everything taken off the undiscounted price of the cart.
    pub fn total_savings(&self) -> Money<'a, Currency> {
        let minor = self
            .line_discount_total
            .to_minor_units()
            .saturating_add(self.global_discount_amount.to_minor_units())
            .saturating_add(self.loyalty_discount_amount.to_minor_units());

        Money::from_minor(minor, self.currency)
    }

    /// Currency of every amount in the breakdown
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

/// Calculates the totals breakdown for a snapshot of cart lines.
///
/// Pure: identical inputs always produce identical totals. The loyalty
/// discount only applies when `customer` is a loyalty member with a non-zero
/// discount.
///
/// # Errors
///
/// - [`PricingError::CurrencyMismatch`]: a line is priced in another currency.
/// - [`PricingError::LineOverflow`] / [`PricingError::Overflow`]: amounts do
///   not fit in minor units.
pub fn calculate_totals<'a>(
    items: &[LineItem<'a>],
    currency: &'static Currency,
    global_discount: Percentage,
    customer: Option<&Customer>,
) -> Result<CartTotals<'a>, PricingError> {
    let mut lines = SmallVec::with_capacity(items.len());
    let mut excl_minor = 0_i64;
    let mut tax_minor = 0_i64;
    let mut line_discount_minor = 0_i64;

    for (idx, item) in items.iter().enumerate() {
        let item_currency = item.base_unit_price().currency();

        if item_currency != currency {
            return Err(PricingError::CurrencyMismatch(
                idx,
                item_currency.iso_alpha_code,
                currency.iso_alpha_code,
            ));
        }

        let line = price_line(item).map_err(|error| match error {
            PricingError::Overflow | PricingError::Discount(DiscountError::PercentConversion) => {
                PricingError::LineOverflow(idx)
            }
            other => other,
        })?;

        excl_minor = checked_total(excl_minor, line.total_excl_tax)?;
        tax_minor = checked_total(tax_minor, line.tax)?;
        line_discount_minor = checked_total(line_discount_minor, line.discount)?;

        lines.push(line);
    }

    let subtotal_minor = excl_minor
        .checked_add(tax_minor)
        .ok_or(PricingError::Overflow)?;

    let global_minor = discounts::percent_of_minor(&global_discount, subtotal_minor)?;
    let after_global_minor = subtotal_minor - global_minor;

    let loyalty = customer.and_then(Customer::applicable_loyalty_discount);

    let loyalty_minor = match &loyalty {
        Some(rate) => discounts::percent_of_minor(rate, after_global_minor)?,
        None => 0,
    };

    let total_minor = after_global_minor - loyalty_minor;

    debug!(
        lines = items.len(),
        subtotal = subtotal_minor,
        global_discount = global_minor,
        loyalty_discount = loyalty_minor,
        total = total_minor,
        currency = currency.iso_alpha_code,
        "calculated cart totals"
    );

    let money = |minor: i64| Money::from_minor(minor, currency);

    Ok(CartTotals {
        lines,
        total_excl_tax: money(excl_minor),
        total_tax: money(tax_minor),
        subtotal_incl_tax: money(subtotal_minor),
        global_discount_rate: discounts::percent_points(global_discount),
        global_discount_amount: money(global_minor),
        subtotal_after_global_discount: money(after_global_minor),
        loyalty_discount_rate: loyalty.map_or(Decimal::ZERO, discounts::percent_points),
        loyalty_discount_amount: money(loyalty_minor),
        total_incl_tax: money(total_minor),
        line_discount_total: money(line_discount_minor),
        currency,
    })
}

/// Price a single line: line discount, quantity, then tax extraction.
fn price_line<'a>(item: &LineItem<'a>) -> Result<LineTotals<'a>, PricingError> {
    let currency = item.base_unit_price().currency();
    let quantity = i64::from(item.quantity());

    let base_minor = item.base_unit_price().to_minor_units();
    let final_unit = item.final_unit_price()?;

    let undiscounted_minor = base_minor
        .checked_mul(quantity)
        .ok_or(PricingError::Overflow)?;

    let gross_minor = final_unit
        .to_minor_units()
        .checked_mul(quantity)
        .ok_or(PricingError::Overflow)?;

    let tax_minor = included_tax_minor(&item.tax_rate(), gross_minor)?;

    Ok(LineTotals {
        final_unit_price: final_unit,
        total_incl_tax: Money::from_minor(gross_minor, currency),
        tax: Money::from_minor(tax_minor, currency),
        total_excl_tax: Money::from_minor(gross_minor - tax_minor, currency),
        discount: Money::from_minor(undiscounted_minor - gross_minor, currency),
    })
}

/// Tax contained in a tax-inclusive minor unit amount: `gross × rate / (1 + rate)`.
fn included_tax_minor(rate: &Percentage, gross_minor: i64) -> Result<i64, DiscountError> {
    let rate = discounts::fraction(*rate);

    if rate.is_zero() {
        return Ok(0);
    }

    let gross = Decimal::from_i64(gross_minor).ok_or(DiscountError::PercentConversion)?;

    gross
        .checked_mul(rate)
        .and_then(|taxed| taxed.checked_div(Decimal::ONE + rate))
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}

fn checked_total(acc: i64, amount: Money<'_, Currency>) -> Result<i64, PricingError> {
    acc.checked_add(amount.to_minor_units())
        .ok_or(PricingError::Overflow)
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::{GBP, USD};
    use testresult::TestResult;

    use crate::products::ProductKey;

    use super::*;

    fn rate(points: i64) -> Result<Percentage, DiscountError> {
        discounts::rate_from_points(Decimal::from(points))
    }

    /// Two brake discs at 100.00, 10% off, 19% tax included.
    fn brake_discs() -> TestResult<[LineItem<'static>; 1]> {
        let item = LineItem::new(ProductKey::default(), 2, Money::from_minor(10_000, GBP))?
            .with_discount(rate(10)?)?
            .with_tax_rate(rate(19)?)?;

        Ok([item])
    }

    #[test]
    fn line_discount_and_tax_extraction() -> TestResult {
        let items = brake_discs()?;

        let totals = calculate_totals(&items, GBP, discounts::zero(), None)?;
        let line = totals.lines().first().ok_or("missing line")?;

        assert_eq!(line.final_unit_price, Money::from_minor(9_000, GBP));
        assert_eq!(line.total_incl_tax, Money::from_minor(18_000, GBP));
        assert_eq!(line.tax, Money::from_minor(2_874, GBP));
        assert_eq!(line.discount, Money::from_minor(2_000, GBP));

        assert_eq!(totals.total_excl_tax(), Money::from_minor(15_126, GBP));
        assert_eq!(totals.total_tax(), Money::from_minor(2_874, GBP));
        assert_eq!(totals.subtotal_incl_tax(), Money::from_minor(18_000, GBP));
        assert_eq!(totals.global_discount_amount(), Money::from_minor(0, GBP));
        assert_eq!(totals.loyalty_discount_amount(), Money::from_minor(0, GBP));
        assert_eq!(totals.total_incl_tax(), Money::from_minor(18_000, GBP));

        Ok(())
    }

    #[test]
    fn global_discount_applies_to_tax_inclusive_subtotal() -> TestResult {
        let items = brake_discs()?;

        let totals = calculate_totals(&items, GBP, rate(10)?, None)?;

        assert_eq!(totals.global_discount_rate(), Decimal::from(10));
        assert_eq!(totals.global_discount_amount(), Money::from_minor(1_800, GBP));
        assert_eq!(
            totals.subtotal_after_global_discount(),
            Money::from_minor(16_200, GBP)
        );
        assert_eq!(totals.total_incl_tax(), Money::from_minor(16_200, GBP));

        Ok(())
    }

    #[test]
    fn loyalty_discount_applies_after_global_discount() -> TestResult {
        let items = brake_discs()?;
        let customer = Customer::loyal("C-1", "Garage Amrani", rate(5)?)?;

        let totals = calculate_totals(&items, GBP, rate(10)?, Some(&customer))?;

        assert_eq!(totals.loyalty_discount_rate(), Decimal::from(5));
        assert_eq!(totals.loyalty_discount_amount(), Money::from_minor(810, GBP));
        assert_eq!(totals.total_incl_tax(), Money::from_minor(15_390, GBP));
        assert_eq!(totals.total_savings(), Money::from_minor(4_610, GBP));

        Ok(())
    }

    #[test]
    fn regular_customer_gets_no_loyalty_discount() -> TestResult {
        let items = brake_discs()?;
        let customer = Customer::new("C-2", "Walk-in");

        let totals = calculate_totals(&items, GBP, rate(10)?, Some(&customer))?;

        assert_eq!(totals.loyalty_discount_amount(), Money::from_minor(0, GBP));
        assert_eq!(totals.loyalty_discount_rate(), Decimal::ZERO);
        assert_eq!(
            totals.total_incl_tax(),
            totals.subtotal_after_global_discount()
        );

        Ok(())
    }

    #[test]
    fn global_discount_split_is_exact() -> TestResult {
        let items = [
            LineItem::new(ProductKey::default(), 3, Money::from_minor(1_333, GBP))?
                .with_tax_rate(rate(9)?)?,
            LineItem::new(ProductKey::default(), 1, Money::from_minor(777, GBP))?
                .with_discount(rate(33)?)?
                .with_tax_rate(rate(19)?)?,
        ];

        for points in [0, 1, 7, 13, 50, 99, 100] {
            let totals = calculate_totals(&items, GBP, rate(points)?, None)?;

            assert_eq!(
                totals.global_discount_amount().to_minor_units()
                    + totals.subtotal_after_global_discount().to_minor_units(),
                totals.subtotal_incl_tax().to_minor_units(),
                "split lost a minor unit at {points}%"
            );
            assert_eq!(
                totals.total_excl_tax().to_minor_units() + totals.total_tax().to_minor_units(),
                totals.subtotal_incl_tax().to_minor_units(),
                "tax split lost a minor unit at {points}%"
            );
        }

        Ok(())
    }

    #[test]
    fn calculation_is_idempotent() -> TestResult {
        let items = brake_discs()?;
        let customer = Customer::loyal("C-1", "Garage Amrani", rate(5)?)?;

        let first = calculate_totals(&items, GBP, rate(10)?, Some(&customer))?;
        let second = calculate_totals(&items, GBP, rate(10)?, Some(&customer))?;

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn empty_cart_totals_are_zero() -> TestResult {
        let totals = calculate_totals(&[], GBP, rate(10)?, None)?;

        assert!(totals.lines().is_empty());
        assert_eq!(totals.total_incl_tax(), Money::from_minor(0, GBP));
        assert_eq!(totals.total_savings(), Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn currency_mismatch_errors() -> TestResult {
        let items = [
            LineItem::new(ProductKey::default(), 1, Money::from_minor(100, GBP))?,
            LineItem::new(ProductKey::default(), 1, Money::from_minor(100, USD))?,
        ];

        let result = calculate_totals(&items, GBP, discounts::zero(), None);

        assert_eq!(
            result.err(),
            Some(PricingError::CurrencyMismatch(
                1,
                USD.iso_alpha_code,
                GBP.iso_alpha_code
            ))
        );

        Ok(())
    }

    #[test]
    fn line_overflow_names_the_line() -> TestResult {
        let items = [
            LineItem::new(ProductKey::default(), 1, Money::from_minor(100, GBP))?,
            LineItem::new(ProductKey::default(), u32::MAX, Money::from_minor(i64::MAX, GBP))?,
        ];

        let result = calculate_totals(&items, GBP, discounts::zero(), None);

        assert_eq!(result.err(), Some(PricingError::LineOverflow(1)));

        Ok(())
    }

    #[test]
    fn included_tax_is_zero_for_zero_rate() -> TestResult {
        assert_eq!(included_tax_minor(&discounts::zero(), 12_345)?, 0);

        Ok(())
    }
}
