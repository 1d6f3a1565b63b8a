//! Receipt

use std::{fmt::Write, io};

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    cart::Cart,
    discounts,
    items::LineItem,
    payments::PaymentMethod,
    pricing::{CartTotals, PricingError},
    products::{Catalog, ProductKey},
};

/// Errors that can occur when building a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Error calculating the cart totals.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Error finding a product in the product catalog.
    #[error("Missing product")]
    MissingProduct(ProductKey),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Printable summary of a cart: its totals plus who pays and how.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    items: Vec<LineItem<'a>>,
    totals: CartTotals<'a>,
    customer: Option<String>,
    payment_method: PaymentMethod,
}

impl<'a> Receipt<'a> {
    /// Build a receipt for the current state of a cart.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::Pricing`] if the totals cannot be calculated.
    pub fn from_cart(cart: &Cart<'a>) -> Result<Self, ReceiptError> {
        Ok(Self {
            items: cart.items().to_vec(),
            totals: cart.totals()?,
            customer: cart.customer().map(|customer| customer.name().to_string()),
            payment_method: cart.payment_method(),
        })
    }

    /// Lines the receipt was built from, in cart order
    pub fn items(&self) -> &[LineItem<'a>] {
        &self.items
    }

    /// Totals the receipt was built from
    pub fn totals(&self) -> &CartTotals<'a> {
        &self.totals
    }

    /// Selected customer name, if any
    pub fn customer(&self) -> Option<&str> {
        self.customer.as_deref()
    }

    /// Payment method of the sale
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// Currency used for all monetary values
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.totals.currency()
    }

    /// Prints the receipt to the console.
    ///
    /// # Errors
    ///
    /// Returns an error if a line's product is missing from the catalog or
    /// the receipt cannot be written.
    pub fn write_to(
        &self,
        mut out: impl io::Write,
        catalog: &Catalog<'_>,
    ) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        push_receipt_header(&mut builder);
        append_item_rows(self, catalog, &mut builder)?;

        write_receipt_table(&mut out, builder)?;
        write_receipt_summary(&mut out, self)?;

        Ok(())
    }
}

fn push_receipt_header(builder: &mut Builder) {
    builder.push_record([
        "#",
        "Item",
        "Qty",
        "Unit Price",
        "Discount",
        "Net Unit",
        "Line Total",
        "Tax",
    ]);
}

fn append_item_rows(
    receipt: &Receipt<'_>,
    catalog: &Catalog<'_>,
    builder: &mut Builder,
) -> Result<(), ReceiptError> {
    for (idx, (item, line)) in receipt.items.iter().zip(receipt.totals.lines()).enumerate() {
        let product = catalog
            .get(item.product())
            .ok_or(ReceiptError::MissingProduct(item.product()))?;

        let discount = if discounts::is_zero(item.discount()) {
            String::new()
        } else {
            format!("-{}%", discounts::percent_points(item.discount()))
        };

        let net_unit = if line.final_unit_price == *item.base_unit_price() {
            String::new()
        } else {
            line.final_unit_price.to_string()
        };

        builder.push_record([
            format!("{}", idx + 1),
            format!("{} ({})", product.name, product.reference),
            item.quantity().to_string(),
            item.base_unit_price().to_string(),
            discount,
            net_unit,
            line.total_incl_tax.to_string(),
            format!(
                "{} ({}%)",
                line.tax,
                discounts::percent_points(item.tax_rate())
            ),
        ]);
    }

    Ok(())
}

fn write_receipt_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..8), Alignment::right());

    let table_str = colorize_borders(&table.to_string());

    writeln!(out, "\n{table_str}").map_err(|_err| ReceiptError::IO)
}

fn write_receipt_summary(
    out: &mut impl io::Write,
    receipt: &Receipt<'_>,
) -> Result<(), ReceiptError> {
    let totals = &receipt.totals;

    let mut rows: Vec<(String, String)> = vec![
        (" Total excl. tax:".to_string(), amount(totals.total_excl_tax())),
        (" Tax:".to_string(), amount(totals.total_tax())),
        (" Subtotal:".to_string(), amount(totals.subtotal_incl_tax())),
    ];

    if !totals.global_discount_rate().is_zero() {
        rows.push((
            format!(" Discount ({}%):", totals.global_discount_rate()),
            deduction(totals.global_discount_amount()),
        ));
    }

    if !totals.loyalty_discount_rate().is_zero() {
        rows.push((
            format!(" Loyalty ({}%):", totals.loyalty_discount_rate()),
            deduction(totals.loyalty_discount_amount()),
        ));
    }

    rows.push((
        " \x1b[1mTotal:\x1b[0m".to_string(),
        format!("\x1b[1m{}\x1b[0m", amount(totals.total_incl_tax())),
    ));

    let savings = totals.total_savings();

    if savings.to_minor_units() != 0 {
        rows.push((
            " Savings:".to_string(),
            format!(
                "({:.2}%) {}",
                savings_percent(totals),
                amount(savings)
            ),
        ));
    }

    rows.push((" Payment:".to_string(), format!("{}  ", receipt.payment_method)));

    if let Some(customer) = receipt.customer() {
        rows.push((" Customer:".to_string(), format!("{customer}  ")));
    }

    let label_width = rows
        .iter()
        .map(|(label, _)| visible_width(label))
        .max()
        .unwrap_or_default();

    let value_width = rows
        .iter()
        .map(|(_, value)| visible_width(value))
        .max()
        .unwrap_or_default();

    for (label, value) in &rows {
        write_summary_line(out, label, value, label_width, value_width)?;
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}

fn amount(money: Money<'_, Currency>) -> String {
    format!("{money}  ")
}

fn deduction(money: Money<'_, Currency>) -> String {
    format!("-{money}  ")
}

/// Savings as percent points of the undiscounted cart value.
fn savings_percent(totals: &CartTotals<'_>) -> Decimal {
    let savings = Decimal::from(totals.total_savings().to_minor_units());
    let undiscounted = Decimal::from(
        totals
            .subtotal_incl_tax()
            .to_minor_units()
            .saturating_add(totals.line_discount_total().to_minor_units()),
    );

    if undiscounted.is_zero() {
        return Decimal::ZERO;
    }

    (savings * Decimal::ONE_HUNDRED / undiscounted).round_dp(2)
}

/// Wraps runs of UTF-8 box-drawing characters in ANSI dark-grey escape codes.
fn colorize_borders(table: &str) -> String {
    let mut out = String::with_capacity(table.len() + 256);
    let mut in_run = false;

    for ch in table.chars() {
        let box_char = ('\u{2500}'..='\u{257F}').contains(&ch);

        if box_char && !in_run {
            _ = out.write_str("\x1b[90m");
            in_run = true;
        } else if !box_char && in_run {
            _ = out.write_str("\x1b[0m");
            in_run = false;
        }

        out.push(ch);
    }

    if in_run {
        _ = out.write_str("\x1b[0m");
    }

    out
}

/// Returns the visible (non-ANSI) width of a string.
fn visible_width(s: &str) -> usize {
    let mut width = 0usize;
    let mut in_escape = false;

    for ch in s.chars() {
        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if ch == '\x1b' {
            in_escape = true;
        } else {
            width += 1;
        }
    }

    width
}

/// Writes a summary line with a right-aligned label and a fixed-width value column.
fn write_summary_line(
    out: &mut impl io::Write,
    label: &str,
    value: &str,
    label_col_width: usize,
    value_col_width: usize,
) -> Result<(), ReceiptError> {
    let label_pad = label_col_width.saturating_sub(visible_width(label));
    let value_pad = value_col_width.saturating_sub(visible_width(value));

    writeln!(
        out,
        "{:>label_pad$}{label}  {value_pad}{value}",
        "",
        value_pad = " ".repeat(value_pad)
    )
    .map_err(|_err| ReceiptError::IO)
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{
        customers::Customer,
        discounts::DiscountError,
        items::LineItem,
        products::Product,
    };

    use super::*;

    fn rate(points: i64) -> Result<decimal_percentage::Percentage, DiscountError> {
        discounts::rate_from_points(Decimal::from(points))
    }

    fn brake_disc_sale() -> TestResult<(Catalog<'static>, Cart<'static>)> {
        let mut catalog = Catalog::with_key();

        let key = catalog.insert(Product {
            id: "P-BD-280".to_string(),
            name: "Brake disc 280mm".to_string(),
            reference: "BD-280".to_string(),
            price: Money::from_minor(10_000, GBP),
            tax_rate: rate(19)?,
            stock: 8,
        });

        let product = catalog.get(key).ok_or("missing product")?;
        let item = LineItem::from_product(key, product, 2)?.with_discount(rate(10)?)?;

        let mut cart = Cart::with_items([item], GBP)?;
        cart.set_global_discount(rate(10)?)?;
        cart.select_customer(Some(Customer::loyal("C-1", "Garage Amrani", rate(5)?)?));

        Ok((catalog, cart))
    }

    #[test]
    fn write_to_renders_lines_and_summary() -> TestResult {
        let (catalog, cart) = brake_disc_sale()?;
        let receipt = Receipt::from_cart(&cart)?;

        let mut out = Vec::new();
        receipt.write_to(&mut out, &catalog)?;

        let output = String::from_utf8(out)?;

        assert!(output.contains("Brake disc 280mm (BD-280)"), "{output}");
        assert!(output.contains("£100.00"), "{output}");
        assert!(output.contains("-10%"), "{output}");
        assert!(output.contains("£90.00"), "{output}");
        assert!(output.contains("£180.00"), "{output}");
        assert!(output.contains("£28.74 (19%)"), "{output}");
        assert!(output.contains("Discount (10%):"), "{output}");
        assert!(output.contains("-£18.00"), "{output}");
        assert!(output.contains("Loyalty (5%):"), "{output}");
        assert!(output.contains("-£8.10"), "{output}");
        assert!(output.contains("£153.90"), "{output}");
        assert!(output.contains("Garage Amrani"), "{output}");

        Ok(())
    }

    #[test]
    fn write_to_omits_discount_rows_when_none_apply() -> TestResult {
        let (catalog, mut cart) = brake_disc_sale()?;
        cart.set_global_discount(discounts::zero())?;
        cart.set_line_discount(0, discounts::zero())?;
        cart.select_customer(None);

        let receipt = Receipt::from_cart(&cart)?;

        let mut out = Vec::new();
        receipt.write_to(&mut out, &catalog)?;

        let output = String::from_utf8(out)?;

        assert!(!output.contains("Discount ("), "{output}");
        assert!(!output.contains("Loyalty ("), "{output}");
        assert!(!output.contains("Savings:"), "{output}");
        assert!(output.contains("£200.00"), "{output}");

        Ok(())
    }

    #[test]
    fn write_to_errors_on_missing_product() -> TestResult {
        let (_, cart) = brake_disc_sale()?;
        let receipt = Receipt::from_cart(&cart)?;

        let result = receipt.write_to(Vec::new(), &Catalog::with_key());

        assert!(matches!(result, Err(ReceiptError::MissingProduct(_))));

        Ok(())
    }

    #[test]
    fn receipt_keeps_lines_of_the_cart_it_was_built_from() -> TestResult {
        let (catalog, mut cart) = brake_disc_sale()?;
        let receipt = Receipt::from_cart(&cart)?;

        cart.clear();

        let mut out = Vec::new();
        receipt.write_to(&mut out, &catalog)?;

        let output = String::from_utf8(out)?;

        assert_eq!(receipt.items().len(), receipt.totals().lines().len());
        assert!(output.contains("Brake disc 280mm (BD-280)"), "{output}");
        assert!(output.contains("£28.74 (19%)"), "{output}");

        Ok(())
    }

    #[test]
    fn savings_percent_is_against_undiscounted_value() -> TestResult {
        let (_, cart) = brake_disc_sale()?;
        let totals = cart.totals()?;

        // 46.10 saved out of 200.00
        assert_eq!(savings_percent(&totals), Decimal::new(2305, 2));

        Ok(())
    }

    #[test]
    fn visible_width_ignores_ansi_escapes() {
        assert_eq!(visible_width("\x1b[1mTotal:\x1b[0m"), 6);
        assert_eq!(visible_width("Tax:"), 4);
    }
}
