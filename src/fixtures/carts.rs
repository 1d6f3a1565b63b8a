//! Cart Fixtures

use serde::Deserialize;

use crate::{items::input::LineItemInput, payments::PaymentMethod};

/// A cart as described in YAML.
///
/// Lines use the same loose shape a checkout screen sends, so loading a cart
/// fixture goes through the regular input validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartFixture {
    /// Global discount (e.g., "10%")
    #[serde(default)]
    pub global_discount: Option<String>,

    /// Backend id of the selected customer
    #[serde(default)]
    pub customer: Option<String>,

    /// Payment method
    #[serde(default)]
    pub payment_method: PaymentMethod,

    /// Lines, in cart order
    #[serde(default)]
    pub lines: Vec<LineItemInput>,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::items::input::NumericInput;

    use super::*;

    #[test]
    fn cart_fixture_reads_loose_lines() -> TestResult {
        let fixture: CartFixture = serde_norway::from_str(
            r#"
payment_method: CREDIT
lines:
  - productId: BD-280
    quantity: 2
    discountRate: "10"
"#,
        )?;

        let line = fixture.lines.first().ok_or("missing line")?;

        assert_eq!(fixture.payment_method, PaymentMethod::Credit);
        assert_eq!(line.product_id.as_deref(), Some("BD-280"));
        assert_eq!(line.quantity, Some(NumericInput::Number(2.0)));
        assert_eq!(line.discount_rate, Some(NumericInput::from("10")));

        Ok(())
    }
}
